//! metalens: detección de formato y extracción de metadata de archivos.
//!
//! ```no_run
//! use metalens::metadata::{TypeOverride, run, to_text};
//!
//! let result = run(std::path::Path::new("foto.jpg"), TypeOverride::AutoDetect)?;
//! print!("{}", to_text(&result));
//! # Ok::<(), metalens::error::ExtractError>(())
//! ```

pub mod decoders;
pub mod error;
pub mod formatting;
pub mod metadata;
