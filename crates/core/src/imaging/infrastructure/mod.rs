pub mod directory_image_source;
pub mod image_decoder;
pub mod image_file_writer;
