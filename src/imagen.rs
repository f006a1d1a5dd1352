//! Preparación de imágenes para incrustarlas en el documento.

use std::io::Cursor;

use image::{GenericImageView, ImageFormat};

use crate::error::Result;

/// Lado mayor con el que se incrustan las imágenes en el informe.
pub const LADO_MAXIMO_PX: u32 = 1600;

/// Imagen recodificada como PNG.
#[derive(Debug, Clone)]
pub struct ImagenPreparada {
    pub png: Vec<u8>,
    pub ancho: u32,
    pub alto: u32,
}

/// Decodifica `bytes` (PNG o JPEG), la reduce si su lado mayor supera
/// `lado_maximo` y la recodifica como PNG.
///
/// # Errors
///
/// Falla si los bytes no son una imagen reconocible.
pub fn preparar(bytes: &[u8], lado_maximo: u32) -> Result<ImagenPreparada> {
    let mut imagen = image::load_from_memory(bytes)?;
    let (ancho, alto) = imagen.dimensions();
    if ancho.max(alto) > lado_maximo {
        imagen = imagen.thumbnail(lado_maximo, lado_maximo);
        log::debug!(
            "Imagen reducida de {ancho}x{alto} a {}x{}",
            imagen.width(),
            imagen.height()
        );
    }

    let mut png = Vec::new();
    imagen.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(ImagenPreparada {
        png,
        ancho: imagen.width(),
        alto: imagen.height(),
    })
}
