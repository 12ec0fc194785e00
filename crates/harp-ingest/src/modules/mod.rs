pub mod text_grid;
