//! Documento Word como paquete zip de partes XML.
//!
//! Se conservan todas las entradas de la plantilla en su orden original. Solo
//! se reescriben las partes con texto (`word/document.xml`, cabeceras y pies),
//! las relaciones del documento y `[Content_Types].xml` cuando se añaden
//! imágenes.

pub mod fotos;
pub mod parrafos;
pub mod runs;
pub mod xml;

use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

pub const PARTE_DOCUMENTO: &str = "word/document.xml";
const PARTE_RELACIONES: &str = "word/_rels/document.xml.rels";
const PARTE_TIPOS: &str = "[Content_Types].xml";
const PARTE_ESTILOS: &str = "word/styles.xml";

const TIPO_RELACION_IMAGEN: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Entradas del zip en orden.
#[derive(Debug, Clone)]
pub struct PaqueteDocx {
    entradas: Vec<(String, Vec<u8>)>,
    imagenes: usize,
}

impl PaqueteDocx {
    /// Lee un `.docx` desde memoria.
    ///
    /// # Errors
    ///
    /// Falla si no es un zip o si no contiene `word/document.xml`.
    pub fn leer(bytes: &[u8]) -> Result<Self> {
        let mut archivo = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entradas = Vec::with_capacity(archivo.len());
        for i in 0..archivo.len() {
            let mut entrada = archivo.by_index(i)?;
            let nombre = entrada.name().to_string();
            let mut datos = Vec::new();
            entrada.read_to_end(&mut datos)?;
            entradas.push((nombre, datos));
        }

        let paquete = Self {
            entradas,
            imagenes: 0,
        };
        if paquete.parte(PARTE_DOCUMENTO).is_none() {
            return Err(Error::PlantillaInvalida(format!("falta {PARTE_DOCUMENTO}")));
        }
        log::debug!("Plantilla con {} partes", paquete.entradas.len());
        Ok(paquete)
    }

    #[must_use]
    pub fn parte(&self, nombre: &str) -> Option<&[u8]> {
        self.entradas
            .iter()
            .find(|(n, _)| n == nombre)
            .map(|(_, d)| d.as_slice())
    }

    /// Contenido de una parte XML como texto.
    ///
    /// # Errors
    ///
    /// Falla si la parte no existe o no es UTF-8.
    pub fn parte_texto(&self, nombre: &str) -> Result<String> {
        let datos = self
            .parte(nombre)
            .ok_or_else(|| Error::PlantillaInvalida(format!("falta {nombre}")))?;
        String::from_utf8(datos.to_vec())
            .map_err(|_| Error::PlantillaInvalida(format!("{nombre} no es UTF-8")))
    }

    /// Sustituye una parte existente o la añade al final.
    pub fn fijar_parte(&mut self, nombre: &str, datos: Vec<u8>) {
        match self.entradas.iter_mut().find(|(n, _)| n == nombre) {
            Some((_, d)) => *d = datos,
            None => self.entradas.push((nombre.to_string(), datos)),
        }
    }

    pub fn nombres(&self) -> impl Iterator<Item = &str> {
        self.entradas.iter().map(|(n, _)| n.as_str())
    }

    /// Partes con párrafos en los que se sustituyen tokens: el cuerpo, las
    /// cabeceras y los pies de página.
    #[must_use]
    pub fn partes_con_texto(&self) -> Vec<String> {
        self.nombres()
            .filter(|n| {
                *n == PARTE_DOCUMENTO
                    || es_parte_numerada(n, "word/header")
                    || es_parte_numerada(n, "word/footer")
            })
            .map(str::to_string)
            .collect()
    }

    /// Añade una imagen PNG al cuerpo del documento y devuelve el
    /// identificador de su relación.
    ///
    /// # Errors
    ///
    /// Falla si faltan las relaciones del documento o los tipos de contenido.
    pub fn anadir_imagen_png(&mut self, png: Vec<u8>) -> Result<String> {
        let mut relaciones = self.parte_texto(PARTE_RELACIONES)?;
        let (id, destino) = loop {
            self.imagenes += 1;
            let id = format!("rIdInforme{}", self.imagenes);
            let destino = format!("media/informe{}.png", self.imagenes);
            let ocupado = relaciones.contains(&format!("Id=\"{id}\""))
                || self.parte(&format!("word/{destino}")).is_some();
            if !ocupado {
                break (id, destino);
            }
        };

        let relacion =
            format!(r#"<Relationship Id="{id}" Type="{TIPO_RELACION_IMAGEN}" Target="{destino}"/>"#);
        insertar_antes_de_cierre(&mut relaciones, "</Relationships>", &relacion)?;
        self.fijar_parte(PARTE_RELACIONES, relaciones.into_bytes());

        let mut tipos = self.parte_texto(PARTE_TIPOS)?;
        if !tipos.to_ascii_lowercase().contains(r#"extension="png""#) {
            insertar_antes_de_cierre(
                &mut tipos,
                "</Types>",
                r#"<Default Extension="png" ContentType="image/png"/>"#,
            )?;
            self.fijar_parte(PARTE_TIPOS, tipos.into_bytes());
        }

        self.fijar_parte(&format!("word/{destino}"), png);
        log::debug!("Imagen añadida como {destino} ({id})");
        Ok(id)
    }

    /// Identificador del estilo "heading 1" de la plantilla, si lo tiene.
    ///
    /// Word traduce el identificador según el idioma (`Heading1`, `Ttulo1`...),
    /// pero el nombre interno siempre es `heading 1`.
    ///
    /// # Errors
    ///
    /// Falla si `word/styles.xml` no es XML válido.
    pub fn estilo_titulo(&self) -> Result<Option<String>> {
        let Some(datos) = self.parte(PARTE_ESTILOS) else {
            return Ok(None);
        };
        let mut reader = Reader::from_reader(datos);
        let mut buf = Vec::new();
        let mut estilo_actual: Option<String> = None;
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == b"w:style" => {
                    estilo_actual = parrafos::atributo(&e, b"w:styleId");
                }
                Event::Empty(e) if e.name().as_ref() == b"w:name" => {
                    let es_titulo = parrafos::atributo(&e, b"w:val")
                        .is_some_and(|v| v.eq_ignore_ascii_case("heading 1"));
                    if es_titulo && estilo_actual.is_some() {
                        return Ok(estilo_actual);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"w:style" => estilo_actual = None,
                Event::Eof => return Ok(None),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Serializa el paquete. Las imágenes van sin comprimir y el resto con
    /// deflate, como las guarda Word.
    ///
    /// # Errors
    ///
    /// Falla si no se puede escribir el zip.
    pub fn escribir(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let comprimido = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let almacenado = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (nombre, datos) in &self.entradas {
            let opciones = if nombre.starts_with("word/media/") {
                almacenado
            } else {
                comprimido
            };
            zip.start_file(nombre.as_str(), opciones)?;
            zip.write_all(datos)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// `word/header1.xml`, `word/footer.xml`...
fn es_parte_numerada(nombre: &str, prefijo: &str) -> bool {
    nombre
        .strip_prefix(prefijo)
        .and_then(|resto| resto.strip_suffix(".xml"))
        .is_some_and(|numero| numero.chars().all(|c| c.is_ascii_digit()))
}

fn insertar_antes_de_cierre(xml: &mut String, cierre: &str, fragmento: &str) -> Result<()> {
    let posicion = xml
        .rfind(cierre)
        .ok_or_else(|| Error::PlantillaInvalida(format!("no se encuentra {cierre}")))?;
    xml.insert_str(posicion, fragmento);
    Ok(())
}
