//! Reportaje fotográfico al final del informe.
//!
//! Las fotos se colocan en cuadrículas de dos columnas, como mucho tres filas
//! por página. Cada cuadrícula va seguida de un salto de página.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::xml::{self, Dibujo, IdsDibujo, EMU_POR_PULGADA};
use super::PaqueteDocx;
use super::parrafos::MARCA_ERROR_IMAGEN;
use crate::error::{Error, Result};
use crate::imagen;

pub const COLUMNAS: usize = 2;
pub const FILAS_POR_PAGINA: usize = 3;
pub const FOTOS_POR_PAGINA: usize = COLUMNAS * FILAS_POR_PAGINA;
/// Máximo de fotos admitidas en un informe.
pub const MAX_FOTOS: usize = 24;

pub const TITULO_REPORTAJE: &str = "Reportaje fotográfico";

/// Ancho de cada foto en la cuadrícula: 2,5 pulgadas.
const ANCHO_FOTO_EMU: u64 = EMU_POR_PULGADA * 5 / 2;
/// Ancho de columna en twips (mitad de una página A4 con márgenes de 2 cm).
const ANCHO_COLUMNA_TWIPS: u32 = 4819;

/// Pies de foto disponibles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pie {
    VistaGeneral,
    Fachada,
    EstanciaAfectada,
    DetalleDanos,
    OrigenSiniestro,
    BienesDanados,
    Reparacion,
}

impl Pie {
    pub const TODOS: &'static [Self] = &[
        Self::VistaGeneral,
        Self::Fachada,
        Self::EstanciaAfectada,
        Self::DetalleDanos,
        Self::OrigenSiniestro,
        Self::BienesDanados,
        Self::Reparacion,
    ];

    /// Clave corta usada en la línea de órdenes.
    #[must_use]
    pub const fn clave(self) -> &'static str {
        match self {
            Self::VistaGeneral => "vista-general",
            Self::Fachada => "fachada",
            Self::EstanciaAfectada => "estancia",
            Self::DetalleDanos => "detalle",
            Self::OrigenSiniestro => "origen",
            Self::BienesDanados => "bienes",
            Self::Reparacion => "reparacion",
        }
    }

    #[must_use]
    pub const fn texto(self) -> &'static str {
        match self {
            Self::VistaGeneral => "Vista general",
            Self::Fachada => "Fachada del inmueble",
            Self::EstanciaAfectada => "Estancia afectada",
            Self::DetalleDanos => "Detalle de los daños",
            Self::OrigenSiniestro => "Origen del siniestro",
            Self::BienesDanados => "Bienes dañados",
            Self::Reparacion => "Reparación realizada",
        }
    }
}

impl fmt::Display for Pie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.texto())
    }
}

impl FromStr for Pie {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Self::TODOS
            .iter()
            .copied()
            .find(|p| p.clave().eq_ignore_ascii_case(s) || p.texto().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let claves: Vec<_> = Self::TODOS.iter().map(|p| p.clave()).collect();
                format!("pie desconocido '{s}' (valores: {})", claves.join(", "))
            })
    }
}

/// Foto del reportaje.
///
/// Los bytes se leen tal cual; si no son una imagen válida la celda recibe la
/// marca de error al generar el informe.
#[derive(Debug, Clone)]
pub struct Foto {
    pub nombre: String,
    pub bytes: Vec<u8>,
    pub pie: Option<Pie>,
}

impl Foto {
    pub fn new(nombre: impl Into<String>, bytes: Vec<u8>, pie: Option<Pie>) -> Self {
        Self {
            nombre: nombre.into(),
            bytes,
            pie,
        }
    }

    /// Lee la foto de disco. Un fichero ilegible no aborta el informe: se
    /// registra y la foto queda vacía.
    pub fn desde_fichero(ruta: &Path, pie: Option<Pie>) -> Self {
        let bytes = std::fs::read(ruta).unwrap_or_else(|e| {
            log::warn!("No se pudo leer la foto {}: {e}", ruta.display());
            Vec::new()
        });
        Self::new(ruta.display().to_string(), bytes, pie)
    }
}

/// Fotos de un informe, en orden.
#[derive(Debug, Clone, Default)]
pub struct LoteFotos {
    fotos: Vec<Foto>,
}

impl LoteFotos {
    /// # Errors
    ///
    /// [`Error::DemasiadasFotos`] si hay más de [`MAX_FOTOS`].
    pub fn new(fotos: Vec<Foto>) -> Result<Self> {
        if fotos.len() > MAX_FOTOS {
            return Err(Error::DemasiadasFotos {
                recibidas: fotos.len(),
                maximo: MAX_FOTOS,
            });
        }
        Ok(Self { fotos })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fotos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fotos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Foto> {
        self.fotos.iter()
    }
}

/// Una página del reportaje: posición de cada foto por fila, `None` en las
/// celdas sobrantes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cuadricula {
    pub filas: Vec<[Option<usize>; COLUMNAS]>,
}

impl Cuadricula {
    /// Celdas con foto.
    #[must_use]
    pub fn ocupadas(&self) -> usize {
        self.filas.iter().flatten().flatten().count()
    }
}

/// Reparte `total` fotos en cuadrículas de [`FOTOS_POR_PAGINA`], cada una con
/// `ceil(fotos / COLUMNAS)` filas.
#[must_use]
pub fn planificar(total: usize) -> Vec<Cuadricula> {
    (0..total)
        .step_by(FOTOS_POR_PAGINA)
        .map(|inicio| {
            let fin = (inicio + FOTOS_POR_PAGINA).min(total);
            let filas = (inicio..fin)
                .step_by(COLUMNAS)
                .map(|primera| {
                    let mut fila = [None; COLUMNAS];
                    for (columna, celda) in fila.iter_mut().enumerate() {
                        let indice = primera + columna;
                        if indice < fin {
                            *celda = Some(indice);
                        }
                    }
                    fila
                })
                .collect();
            Cuadricula { filas }
        })
        .collect()
}

/// Resultado de montar el reportaje.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reportaje {
    pub xml: String,
    pub cuadriculas: usize,
    pub insertadas: usize,
    pub fallidas: usize,
}

/// Monta el reportaje: salto de página, título y las cuadrículas. Las fotos
/// se añaden al paquete; las que no se pueden decodificar dejan
/// [`MARCA_ERROR_IMAGEN`] en su celda.
///
/// # Errors
///
/// Solo falla si no se pueden registrar las imágenes en el paquete.
pub fn montar(
    paquete: &mut PaqueteDocx,
    lote: &LoteFotos,
    estilo_titulo: Option<&str>,
    ids: &mut IdsDibujo,
) -> Result<Reportaje> {
    let mut reportaje = Reportaje::default();
    if lote.is_empty() {
        return Ok(reportaje);
    }

    let mut celdas = Vec::with_capacity(lote.len());
    for (i, foto) in lote.iter().enumerate() {
        let celda = match imagen::preparar(&foto.bytes, imagen::LADO_MAXIMO_PX) {
            Ok(preparada) => {
                let relacion = paquete.anadir_imagen_png(preparada.png)?;
                let dibujo =
                    Dibujo::con_ancho(relacion, ANCHO_FOTO_EMU, preparada.ancho, preparada.alto);
                reportaje.insertadas += 1;
                celda_foto(&dibujo.run(ids), foto.pie)
            }
            Err(e) => {
                log::warn!("Foto {} ({}) no insertada: {e}", i + 1, foto.nombre);
                reportaje.fallidas += 1;
                celda_foto(&xml::run_texto(MARCA_ERROR_IMAGEN), foto.pie)
            }
        };
        celdas.push(celda);
    }

    let mut salida = xml::parrafo_salto_pagina();
    salida.push_str(&xml::parrafo_titulo(TITULO_REPORTAJE, estilo_titulo));
    for cuadricula in planificar(lote.len()) {
        let filas: Vec<Vec<String>> = cuadricula
            .filas
            .iter()
            .map(|fila| {
                fila.iter()
                    .map(|celda| celda.map(|i| celdas[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        salida.push_str(&xml::tabla(&filas, ANCHO_COLUMNA_TWIPS));
        salida.push_str(&xml::parrafo_salto_pagina());
        reportaje.cuadriculas += 1;
    }

    log::info!(
        "Reportaje: {} fotos en {} páginas ({} con error)",
        reportaje.insertadas,
        reportaje.cuadriculas,
        reportaje.fallidas
    );
    reportaje.xml = salida;
    Ok(reportaje)
}

fn celda_foto(run: &str, pie: Option<Pie>) -> String {
    let mut celda = xml::parrafo_centrado(run, None);
    if let Some(pie) = pie {
        celda.push_str(&xml::parrafo_centrado(&xml::run_pie(pie.texto()), None));
    }
    celda
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::docx::pruebas;

    fn png(ancho: u32, alto: u32) -> Vec<u8> {
        let imagen = image::RgbImage::from_pixel(ancho, alto, image::Rgb([200, 30, 30]));
        let mut bytes = Vec::new();
        imagen
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn siete_fotos_dos_cuadriculas() {
        let plan = planificar(7);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].filas.len(), 3);
        assert_eq!(plan[0].ocupadas(), 6);
        assert_eq!(plan[1].filas, vec![[Some(6), None]]);
        assert_eq!(plan[1].ocupadas(), 1);
    }

    #[test]
    fn filas_redondeadas_hacia_arriba() {
        assert!(planificar(0).is_empty());
        assert_eq!(planificar(1)[0].filas.len(), 1);
        assert_eq!(planificar(3)[0].filas, vec![[Some(0), Some(1)], [Some(2), None]]);
        assert_eq!(planificar(12).len(), 2);
        assert_eq!(planificar(12)[1].ocupadas(), 6);
    }

    #[test]
    fn demasiadas_fotos() {
        let fotos = vec![Foto::new("x", Vec::new(), None); MAX_FOTOS + 1];
        assert!(matches!(
            LoteFotos::new(fotos),
            Err(Error::DemasiadasFotos { recibidas: 25, maximo: 24 })
        ));
    }

    #[test]
    fn pie_desde_clave_o_texto() {
        assert_eq!("detalle".parse::<Pie>(), Ok(Pie::DetalleDanos));
        assert_eq!("Vista General".parse::<Pie>(), Ok(Pie::VistaGeneral));
        assert!("selfie".parse::<Pie>().is_err());
    }

    #[test]
    fn foto_rota_deja_marca_y_sigue() {
        let mut paquete = PaqueteDocx::leer(&pruebas::plantilla("<w:p/>")).unwrap();
        let lote = LoteFotos::new(vec![
            Foto::new("a.png", png(40, 30), Some(Pie::Fachada)),
            Foto::new("rota.jpg", b"no soy una imagen".to_vec(), None),
            Foto::new("b.png", png(30, 40), None),
        ])
        .unwrap();

        let reportaje = montar(&mut paquete, &lote, Some("Ttulo1"), &mut IdsDibujo::new()).unwrap();

        assert_eq!(reportaje.insertadas, 2);
        assert_eq!(reportaje.fallidas, 1);
        assert_eq!(reportaje.cuadriculas, 1);
        assert_eq!(reportaje.xml.matches("<w:drawing>").count(), 2);
        assert_eq!(reportaje.xml.matches(MARCA_ERROR_IMAGEN).count(), 1);
        assert_eq!(reportaje.xml.matches("Fachada del inmueble").count(), 1);
        assert!(reportaje.xml.contains(r#"<w:pStyle w:val="Ttulo1"/>"#));
        assert_eq!(reportaje.xml.matches(r#"<w:br w:type="page"/>"#).count(), 2);
        // Segunda fila: una foto y una celda vacía.
        assert!(reportaje.xml.contains("<w:p/></w:tc></w:tr></w:tbl>"));
        assert!(paquete.parte("word/media/informe2.png").is_some());
        assert!(paquete.parte("word/media/informe3.png").is_none());
    }

    #[test]
    fn foto_ilegible_deja_marca() {
        let dir = tempfile::tempdir().unwrap();
        let ruta = dir.path().join("no-existe.jpg");
        let foto = Foto::desde_fichero(&ruta, Some(Pie::EstanciaAfectada));
        assert!(foto.bytes.is_empty());
        assert!(foto.nombre.ends_with("no-existe.jpg"));

        let mut paquete = PaqueteDocx::leer(&pruebas::plantilla("<w:p/>")).unwrap();
        let lote = LoteFotos::new(vec![foto]).unwrap();
        let reportaje = montar(&mut paquete, &lote, None, &mut IdsDibujo::new()).unwrap();

        assert_eq!(reportaje.insertadas, 0);
        assert_eq!(reportaje.fallidas, 1);
        assert_eq!(reportaje.xml.matches(MARCA_ERROR_IMAGEN).count(), 1);
        assert!(!reportaje.xml.contains("<w:drawing>"));
        assert!(paquete.parte("word/media/informe1.png").is_none());
    }

    #[test]
    fn siete_fotos_con_saltos_de_pagina() {
        let mut paquete = PaqueteDocx::leer(&pruebas::plantilla("<w:p/>")).unwrap();
        let fotos = (0..7).map(|i| Foto::new(format!("{i}.png"), png(8, 6), None)).collect();
        let reportaje = montar(
            &mut paquete,
            &LoteFotos::new(fotos).unwrap(),
            None,
            &mut IdsDibujo::new(),
        )
        .unwrap();

        assert_eq!(reportaje.cuadriculas, 2);
        assert_eq!(reportaje.xml.matches("<w:tbl>").count(), 2);
        assert_eq!(reportaje.xml.matches("<w:drawing>").count(), 7);
        // Uno antes del título y uno tras cada cuadrícula.
        assert_eq!(reportaje.xml.matches(r#"<w:br w:type="page"/>"#).count(), 3);
        assert!(reportaje.xml.ends_with(&xml::parrafo_salto_pagina()));
        assert!(reportaje.xml.contains("<w:b/>"));
    }
}
