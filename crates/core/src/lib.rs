pub mod clustering;
pub mod corpus;
pub mod detection;
pub mod imaging;
pub mod matching;
pub mod pipeline;
pub mod registry;
pub mod shared;
pub mod thumbnails;
