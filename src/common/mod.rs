pub mod roof_image;
