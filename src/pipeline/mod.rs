pub mod document;
pub mod section;
pub mod rules;
pub mod families; // One extractor per document family
pub mod assemble;
pub mod batch; // Directory in, CSV out
