//! Errores del generador de informes.

use std::path::PathBuf;

/// Resultado con el error del generador.
pub type Result<T> = std::result::Result<T, Error>;

/// Errores que pueden abortar la generación de un informe.
///
/// Los campos sin coincidencia y las fotos que no se pueden leer no son
/// errores: los primeros quedan vacíos y las segundas se sustituyen por una
/// marca visible en su celda.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No se indicó plantilla Word.
    #[error("se requiere una plantilla Word (.docx)")]
    FaltaPlantilla,

    /// No se indicó texto de encargo o está vacío.
    #[error("se requiere el texto del encargo")]
    FaltaEncargo,

    /// El fichero no tiene la estructura de un documento Word.
    #[error("plantilla no válida: {0}")]
    PlantillaInvalida(String),

    /// Se superó el número máximo de fotos por informe.
    #[error("demasiadas fotos: {recibidas} (máximo {maximo})")]
    DemasiadasFotos { recibidas: usize, maximo: usize },

    /// El documento de catastro no se pudo interpretar.
    #[error("catastro: {0}")]
    Catastro(String),

    /// El libro de pólizas no tiene ninguna hoja.
    #[error("la hoja de pólizas {} está vacía", .0.display())]
    PolizasVacias(PathBuf),

    /// Extensión de fichero no admitida.
    #[error("formato no soportado: {}", .0.display())]
    FormatoNoSoportado(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("patrón no válido: {0}")]
    Regex(#[from] regex::Error),

    #[error("imagen: {0}")]
    Imagen(#[from] image::ImageError),

    #[error("pdf: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("excel: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("configuración: {0}")]
    Configuracion(#[from] serde_json::Error),
}
