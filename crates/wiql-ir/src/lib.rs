//! WIQL intermediate representation and translator
//!
//! A query AST is walked into a [`TranslatedQuery`]: the selected fields plus
//! ordered where/order clauses made of [`Fragment`]s. Grouping is decided
//! while walking, so rendering is plain concatenation.

mod fragment;
mod query;
pub mod text;
pub mod translator;

pub use fragment::Fragment;
pub use query::{TranslatedQuery, FROM_SOURCE};
pub use translator::{ProjectionMode, TranslateError, WiqlTranslator, WORK_ITEM_TYPE_FIELD};
