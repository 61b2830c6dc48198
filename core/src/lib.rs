pub mod catalog;
pub mod db;
pub mod diary;
pub mod error;
pub mod meal_editor;
pub mod models;
pub mod nutrition;
pub mod openfoodfacts;
pub mod paging;
pub mod search;
pub mod service;
pub mod yaml_import;
