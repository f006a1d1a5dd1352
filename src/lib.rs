//! Generador de informes de siniestros.
//!
//! A partir del texto de un encargo, el documento de catastro y las fotos de
//! la visita, rellena una plantilla Word: sustituye los tokens `{{CAMPO}}`,
//! coloca el plano catastral en `{{IMAGEN_CATASTRO}}` y añade al final un
//! reportaje fotográfico.
//!
//! ```no_run
//! use generador_ts::{generar, guardar, Configuracion, Entradas, Extractor};
//!
//! # fn main() -> generador_ts::Result<()> {
//! let entradas = Entradas {
//!     plantilla: Some("plantilla.docx".into()),
//!     encargo: Some(std::fs::read_to_string("encargo.txt")?),
//!     ..Entradas::default()
//! };
//! let solicitud = entradas.cargar(&Configuracion::default())?;
//! let informe = generar(&solicitud, &Extractor::nuevo()?)?;
//! guardar(&informe, std::path::Path::new("."))?;
//! # Ok(())
//! # }
//! ```

pub mod campos;
pub mod catastro;
pub mod configuracion;
pub mod docx;
pub mod error;
pub mod extraccion;
pub mod generador;
pub mod imagen;
pub mod polizas;

pub use campos::{Campo, MapaCampos};
pub use catastro::{Catastro, FuenteCatastro};
pub use configuracion::Configuracion;
pub use docx::fotos::{Foto, LoteFotos, Pie, MAX_FOTOS};
pub use error::{Error, Result};
pub use extraccion::Extractor;
pub use generador::{generar, guardar, nombre_fichero, Entradas, Informe, Solicitud};
pub use polizas::TablaRamos;
