//! Internal pipeline stages.
//!
//! Each sub-module handles one stage of the request:
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`input`]       | Validate the request and load `.txt` / `.pdf` content |
//! | [`extract`]     | Pull the text layer out of a PDF via pdfium |
//! | [`chunk`]       | Split content into bounded, contiguous chunks |
//! | [`format`]      | Render prompts and parse responses (JSON or line mode) |
//! | [`postprocess`] | Clean raw model output before parsing |
//! | [`model`]       | The completion-model seam and its edgequake-llm adapter |
//! | [`cards`]       | Per-chunk generation with retry and fallback |
//! | [`dedup`]       | Merge chunk results, drop duplicate questions |
//! | [`persist`]     | Write CSV / JSON / TXT artifacts |

pub mod cards;
pub mod chunk;
pub mod dedup;
pub mod extract;
pub mod format;
pub mod input;
pub mod model;
pub mod persist;
pub mod postprocess;
