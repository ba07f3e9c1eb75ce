//! Document intake: upload of parsed text and section normalization.
//!
//! Binary parsing (PDF/DOCX) is an external collaborator; this module takes
//! already-extracted text and splits it into ordered sections and chunks.

pub mod handlers;
pub mod sections;
