pub mod auth_form;
pub mod dark_mode;
pub mod header;
pub mod image_grid;
pub mod label_panel;
pub mod model_panel;
pub mod project_list;
pub mod project_view;
pub mod upload_section;
pub mod utils;
