mod catalog;
mod diary;
mod helpers;
mod import;
mod meal;
mod search;
mod summary;

pub(crate) use catalog::{CatalogKind, cmd_catalog_add, cmd_catalog_delete, cmd_catalog_list};
pub(crate) use diary::{cmd_day, cmd_log, cmd_unlog};
pub(crate) use import::cmd_import_yaml;
pub(crate) use meal::{cmd_meal_add, cmd_meal_delete, cmd_meal_edit, cmd_meal_list};
pub(crate) use search::cmd_search;
pub(crate) use summary::cmd_summary;
