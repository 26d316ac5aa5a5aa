//! Field Extraction Rule Set.
//!
//! Each document family owns an ordered table of `ExtractionRule`s. A rule is
//! a field name plus a `Strategy` variant; evaluating it against a located
//! section (text and grids) yields zero or more fields. Rules are pure apart
//! from logging: a rule that cannot find its target yields `FieldValue::Null`
//! (or an empty string for label-style strategies) and never aborts the
//! remaining rules.

pub mod keywords;
pub mod normalize;
pub mod questions;
pub mod types;

pub use keywords::{KeywordGroup, KeywordScan};
pub use normalize::{PhraseClassifier, PhraseRule, TextCleaner};
pub use questions::{QuestionAnswer, QuestionScanner};
pub use types::*;
