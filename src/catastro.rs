//! Documento de catastro: PDF de la Sede Electrónica o imagen.
//!
//! Del PDF se usa solo la primera página: su texto para los campos de
//! catastro y la mayor imagen JPEG incrustada (el plano) para la ranura
//! `{{IMAGEN_CATASTRO}}`. De una imagen no se extrae texto.

use std::path::Path;

use lopdf::Document;

use crate::error::{Error, Result};

/// Origen del catastro tal como lo entrega el usuario.
#[derive(Debug, Clone)]
pub enum FuenteCatastro {
    Pdf(Vec<u8>),
    Imagen(Vec<u8>),
}

impl FuenteCatastro {
    /// Lee el fichero y decide el tipo por la extensión.
    ///
    /// # Errors
    ///
    /// Falla si la extensión no es pdf, png, jpg o jpeg, o si no se puede leer.
    pub fn abrir(ruta: &Path) -> Result<Self> {
        let extension = ruta
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => Ok(Self::Pdf(std::fs::read(ruta)?)),
            Some("png" | "jpg" | "jpeg") => Ok(Self::Imagen(std::fs::read(ruta)?)),
            _ => Err(Error::FormatoNoSoportado(ruta.to_path_buf())),
        }
    }
}

/// Lo que se aprovecha del catastro.
#[derive(Debug, Clone, Default)]
pub struct Catastro {
    pub texto: Option<String>,
    pub imagen: Option<Vec<u8>>,
}

impl Catastro {
    /// # Errors
    ///
    /// Falla si el PDF no se puede abrir o no tiene páginas.
    pub fn leer(fuente: &FuenteCatastro) -> Result<Self> {
        match fuente {
            FuenteCatastro::Imagen(bytes) => Ok(Self {
                texto: None,
                imagen: Some(bytes.clone()),
            }),
            FuenteCatastro::Pdf(bytes) => leer_pdf(bytes),
        }
    }
}

fn leer_pdf(bytes: &[u8]) -> Result<Catastro> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();
    let Some((&numero, &page_id)) = pages.iter().next() else {
        return Err(Error::Catastro("el PDF no tiene páginas".into()));
    };
    log::debug!("Catastro: PDF de {} páginas, se usa la {numero}", pages.len());

    let texto = match doc.extract_text(&[numero]) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Error extrayendo texto del catastro: {e}");
            None
        }
    };

    let imagen = match doc.get_page_images(page_id) {
        Ok(imagenes) => imagenes
            .into_iter()
            .filter(|i| {
                i.filters
                    .as_ref()
                    .is_some_and(|f| f.iter().any(|n| n == "DCTDecode"))
            })
            .max_by_key(|i| i.width.saturating_mul(i.height))
            .map(|i| i.content.to_vec()),
        Err(e) => {
            log::warn!("Error leyendo imágenes del catastro: {e}");
            None
        }
    };
    if imagen.is_none() {
        log::info!("El PDF de catastro no trae plano en JPEG");
    }

    Ok(Catastro { texto, imagen })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    use super::*;

    fn jpeg() -> Vec<u8> {
        let imagen = image::RgbImage::from_pixel(8, 6, image::Rgb([90, 90, 90]));
        let mut bytes = Vec::new();
        imagen
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    fn pdf_catastro(plano: &[u8]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let plano_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 6,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            plano.to_vec(),
        ));
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal("Referencia catastral: 9872023VH5797S0001WX")],
                ),
                Operation::new("ET", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![80.into(), 0.into(), 0.into(), 60.into(), 50.into(), 500.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => dictionary! { "Im1" => plano_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pdf_texto_y_plano_de_la_primera_pagina() {
        let plano = jpeg();
        let catastro = Catastro::leer(&FuenteCatastro::Pdf(pdf_catastro(&plano))).unwrap();
        assert!(catastro
            .texto
            .as_deref()
            .is_some_and(|t| t.contains("9872023VH5797S0001WX")));
        assert_eq!(catastro.imagen.as_deref(), Some(plano.as_slice()));
    }

    #[test]
    fn imagen_sin_texto() {
        let catastro = Catastro::leer(&FuenteCatastro::Imagen(vec![1, 2, 3])).unwrap();
        assert!(catastro.texto.is_none());
        assert_eq!(catastro.imagen, Some(vec![1, 2, 3]));
    }

    #[test]
    fn pdf_roto() {
        assert!(matches!(
            Catastro::leer(&FuenteCatastro::Pdf(b"%PDF-1.5 roto".to_vec())),
            Err(Error::Pdf(_))
        ));
    }

    #[test]
    fn extension_no_soportada() {
        assert!(matches!(
            FuenteCatastro::abrir(Path::new("catastro.docx")),
            Err(Error::FormatoNoSoportado(_))
        ));
    }
}
