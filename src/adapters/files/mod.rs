pub mod image_sequence;
