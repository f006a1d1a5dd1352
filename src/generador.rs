//! Generación del informe: encargo y catastro → campos → plantilla rellena.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::campos::{Campo, MapaCampos};
use crate::catastro::{Catastro, FuenteCatastro};
use crate::configuracion::Configuracion;
use crate::docx::fotos::{self, Foto, LoteFotos, Pie, Reportaje, MAX_FOTOS};
use crate::docx::parrafos::{self, Ajustes, Cambios, RanuraImagen, Sustitutor};
use crate::docx::xml::{Dibujo, IdsDibujo, EMU_POR_PULGADA};
use crate::docx::{PaqueteDocx, PARTE_DOCUMENTO};
use crate::error::{Error, Result};
use crate::extraccion::Extractor;
use crate::imagen;
use crate::polizas::TablaRamos;

/// Nombre del informe cuando el encargo no trae expediente.
pub const NOMBRE_POR_DEFECTO: &str = "informe_generado.docx";

/// Ancho del plano catastral en el documento: 6 pulgadas.
const ANCHO_PLANO_EMU: u64 = EMU_POR_PULGADA * 6;

/// Lo que indica el usuario, todavía sin leer de disco.
#[derive(Debug, Clone, Default)]
pub struct Entradas {
    /// Plantilla explícita; si falta se toma la de la configuración.
    pub plantilla: Option<PathBuf>,
    pub juridico: bool,
    pub encargo: Option<String>,
    pub catastro: Option<PathBuf>,
    /// Hoja de pólizas explícita; si falta se toma la de la configuración.
    pub polizas: Option<PathBuf>,
    pub fotos: Vec<(PathBuf, Option<Pie>)>,
}

impl Entradas {
    /// Valida las entradas y lee los ficheros.
    ///
    /// La plantilla y el encargo se comprueban antes de tocar el disco.
    ///
    /// # Errors
    ///
    /// [`Error::FaltaPlantilla`], [`Error::FaltaEncargo`] o
    /// [`Error::DemasiadasFotos`] si faltan entradas o sobran fotos; errores
    /// de E/S si la plantilla o el catastro no se pueden leer.
    pub fn cargar(&self, config: &Configuracion) -> Result<Solicitud> {
        let plantilla = self
            .plantilla
            .as_deref()
            .or_else(|| config.plantilla(self.juridico))
            .ok_or(Error::FaltaPlantilla)?;
        let encargo = self
            .encargo
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::FaltaEncargo)?;
        if self.fotos.len() > MAX_FOTOS {
            return Err(Error::DemasiadasFotos {
                recibidas: self.fotos.len(),
                maximo: MAX_FOTOS,
            });
        }

        log::info!("Plantilla: {}", plantilla.display());
        let plantilla = std::fs::read(plantilla)?;
        let catastro = self
            .catastro
            .as_deref()
            .map(FuenteCatastro::abrir)
            .transpose()?;
        let ramos = self
            .polizas
            .as_deref()
            .or(config.hoja_polizas.as_deref())
            .and_then(|ruta| match TablaRamos::cargar(ruta) {
                Ok(tabla) => Some(tabla),
                Err(e) => {
                    log::warn!("Hoja de pólizas {} no disponible: {e}", ruta.display());
                    None
                }
            });
        let fotos = LoteFotos::new(
            self.fotos
                .iter()
                .map(|(ruta, pie)| Foto::desde_fichero(ruta, *pie))
                .collect(),
        )?;

        Ok(Solicitud {
            plantilla,
            encargo: encargo.to_string(),
            catastro,
            ramos,
            fotos,
            fecha_informe: chrono::Local::now().format("%d/%m/%Y").to_string(),
        })
    }
}

/// Todo lo necesario para generar un informe, ya en memoria.
#[derive(Debug, Clone, Default)]
pub struct Solicitud {
    /// Bytes de la plantilla `.docx`.
    pub plantilla: Vec<u8>,
    pub encargo: String,
    pub catastro: Option<FuenteCatastro>,
    pub ramos: Option<TablaRamos>,
    pub fotos: LoteFotos,
    /// Valor de `{{FECHA_INFORME}}`.
    pub fecha_informe: String,
}

/// Informe generado, todavía sin guardar.
#[derive(Debug, Clone)]
pub struct Informe {
    /// Nombre de fichero sugerido.
    pub nombre: String,
    pub campos: MapaCampos,
    pub documento: Vec<u8>,
    pub cambios: Cambios,
    pub reportaje: Reportaje,
}

/// Genera el informe.
///
/// # Errors
///
/// Falla si falta la plantilla o el encargo, si la plantilla no es un
/// `.docx` válido o si el PDF de catastro no se puede abrir. Las fotos y el
/// plano que no se pueden decodificar no son error.
pub fn generar(solicitud: &Solicitud, extractor: &Extractor) -> Result<Informe> {
    if solicitud.plantilla.is_empty() {
        return Err(Error::FaltaPlantilla);
    }
    if solicitud.encargo.trim().is_empty() {
        return Err(Error::FaltaEncargo);
    }

    let catastro = solicitud
        .catastro
        .as_ref()
        .map(Catastro::leer)
        .transpose()?
        .unwrap_or_default();

    let mut campos = extractor.extraer(&solicitud.encargo, catastro.texto.as_deref());
    campos.fijar(Campo::FechaInforme, solicitud.fecha_informe.as_str());
    if let Some(ramos) = &solicitud.ramos {
        let modelo = campos.get(Campo::ModeloPoliza).to_string();
        if !modelo.is_empty() {
            match ramos.buscar(&modelo).map(str::to_string) {
                Some(ramo) => campos.fijar(Campo::Ramo, ramo),
                None => log::info!("Modelo de póliza {modelo} sin ramo en la hoja"),
            }
        }
    }

    let mut paquete = PaqueteDocx::leer(&solicitud.plantilla)?;
    let mut ids = IdsDibujo::new();

    let mut plano = None;
    let mut plano_roto = false;
    if let Some(bytes) = &catastro.imagen {
        match imagen::preparar(bytes, imagen::LADO_MAXIMO_PX) {
            Ok(preparada) => {
                let relacion = paquete.anadir_imagen_png(preparada.png)?;
                plano = Some(Dibujo::con_ancho(
                    relacion,
                    ANCHO_PLANO_EMU,
                    preparada.ancho,
                    preparada.alto,
                ));
            }
            Err(e) => {
                log::warn!("Imagen de catastro no insertada: {e}");
                plano_roto = true;
            }
        }
    }
    let ranura = match &plano {
        Some(dibujo) => RanuraImagen::Dibujo(dibujo),
        None if plano_roto => RanuraImagen::Error,
        None => RanuraImagen::Vacia,
    };

    let estilo = paquete.estilo_titulo()?;
    let reportaje = fotos::montar(&mut paquete, &solicitud.fotos, estilo.as_deref(), &mut ids)?;

    let sustitutor = Sustitutor::nuevo(&campos)?;
    let mut cambios = Cambios::default();
    for nombre in paquete.partes_con_texto() {
        let ajustes = if nombre == PARTE_DOCUMENTO {
            Ajustes {
                imagen_catastro: ranura,
                anexo: Some(reportaje.xml.as_str()).filter(|x| !x.is_empty()),
            }
        } else {
            Ajustes::default()
        };
        let original = paquete.parte_texto(&nombre)?;
        let (nuevo, parte) = parrafos::procesar(&original, &sustitutor, &ajustes, &mut ids)?;
        if parte == Cambios::default() && ajustes.anexo.is_none() {
            continue;
        }
        log::debug!(
            "{nombre}: {} tokens en {} párrafos",
            parte.tokens,
            parte.parrafos
        );
        cambios.tokens += parte.tokens;
        cambios.parrafos += parte.parrafos;
        cambios.ranuras_imagen += parte.ranuras_imagen;
        paquete.fijar_parte(&nombre, nuevo.into_bytes());
    }

    let documento = paquete.escribir()?;
    let nombre = nombre_fichero(&campos);
    log::info!(
        "Informe {nombre}: {} tokens sustituidos, {} fotos",
        cambios.tokens,
        reportaje.insertadas
    );
    Ok(Informe {
        nombre,
        campos,
        documento,
        cambios,
        reportaje,
    })
}

/// `Informe_<EXPEDIENTE>.docx`, con los caracteres no válidos en un nombre
/// de fichero cambiados por `-`.
#[must_use]
pub fn nombre_fichero(campos: &MapaCampos) -> String {
    let expediente = campos.get(Campo::Expediente).trim();
    if expediente.is_empty() {
        return NOMBRE_POR_DEFECTO.to_string();
    }
    let limpio: String = expediente
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("Informe_{limpio}.docx")
}

/// Guarda el informe en `destino`, que puede ser una carpeta o la ruta del
/// fichero. Se escribe en un temporal de la misma carpeta y se renombra, así
/// que un fallo no deja ficheros a medias.
///
/// # Errors
///
/// Falla si no se puede escribir en la carpeta de destino.
pub fn guardar(informe: &Informe, destino: &Path) -> Result<PathBuf> {
    let ruta = if destino.is_dir() {
        destino.join(&informe.nombre)
    } else {
        destino.to_path_buf()
    };
    let carpeta = ruta
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temporal = tempfile::NamedTempFile::new_in(carpeta)?;
    temporal.write_all(&informe.documento)?;
    temporal.as_file().sync_all()?;
    temporal.persist(&ruta).map_err(|e| e.error)?;
    log::info!("Informe guardado en {}", ruta.display());
    Ok(ruta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::pruebas;

    fn campos_con_expediente(expediente: &str) -> MapaCampos {
        let mut campos = MapaCampos::vacio();
        campos.fijar(Campo::Expediente, expediente);
        campos
    }

    #[test]
    fn nombre_del_expediente() {
        assert_eq!(
            nombre_fichero(&campos_con_expediente("2024-001")),
            "Informe_2024-001.docx"
        );
        assert_eq!(
            nombre_fichero(&campos_con_expediente("24/001 B")),
            "Informe_24-001-B.docx"
        );
        assert_eq!(nombre_fichero(&MapaCampos::vacio()), NOMBRE_POR_DEFECTO);
    }

    #[test]
    fn sin_plantilla_no_toca_el_disco() {
        let entradas = Entradas {
            encargo: Some("Expediente: 1".into()),
            catastro: Some("/no/existe/catastro.pdf".into()),
            ..Entradas::default()
        };
        assert!(matches!(
            entradas.cargar(&Configuracion::default()),
            Err(Error::FaltaPlantilla)
        ));
    }

    #[test]
    fn encargo_en_blanco() {
        let entradas = Entradas {
            plantilla: Some("/no/existe/plantilla.docx".into()),
            encargo: Some("  \n ".into()),
            ..Entradas::default()
        };
        assert!(matches!(
            entradas.cargar(&Configuracion::default()),
            Err(Error::FaltaEncargo)
        ));
    }

    #[test]
    fn plantilla_juridica_de_la_configuracion() {
        let dir = tempfile::tempdir().unwrap();
        let juridica = dir.path().join("juridica.docx");
        std::fs::write(&juridica, pruebas::plantilla("<w:p/>")).unwrap();
        let config = Configuracion {
            plantilla_base: Some(dir.path().join("no-existe.docx")),
            plantilla_juridica: Some(juridica),
            hoja_polizas: Some(dir.path().join("no-existe.xlsx")),
        };
        let entradas = Entradas {
            juridico: true,
            encargo: Some("Expediente: 1".into()),
            ..Entradas::default()
        };
        let solicitud = entradas.cargar(&config).unwrap();
        assert!(!solicitud.plantilla.is_empty());
        assert!(solicitud.ramos.is_none());
        assert_eq!(solicitud.fecha_informe.len(), 10);
    }

    #[test]
    fn rellena_ramo_y_fecha() {
        let cuerpo = concat!(
            r#"<w:p><w:r><w:t>{{MODELO_POLIZA}} / {{RAMO}}</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Fecha: {{FECHA_INFORME}}</w:t></w:r></w:p>"#,
        );
        let solicitud = Solicitud {
            plantilla: pruebas::plantilla(cuerpo),
            encargo: "Expediente: 77\nModelo de póliza: hg-12\n".into(),
            ramos: Some([("HG-12".to_string(), "Hogar".to_string())].into_iter().collect()),
            fecha_informe: "01/02/2025".into(),
            ..Solicitud::default()
        };
        let informe = generar(&solicitud, &Extractor::nuevo().unwrap()).unwrap();
        assert_eq!(informe.campos.get(Campo::Ramo), "Hogar");
        assert_eq!(informe.nombre, "Informe_77.docx");
        assert_eq!(informe.cambios.tokens, 3);

        let paquete = PaqueteDocx::leer(&informe.documento).unwrap();
        let documento = paquete.parte_texto(PARTE_DOCUMENTO).unwrap();
        assert!(documento.contains("HG-12 / Hogar"));
        assert!(documento.contains("Fecha: 01/02/2025"));
        assert!(!documento.contains("{{"));
    }

    #[test]
    fn plano_roto_deja_marca() {
        let cuerpo = r#"<w:p><w:r><w:t>{{IMAGEN_CATASTRO}}</w:t></w:r></w:p>"#;
        let solicitud = Solicitud {
            plantilla: pruebas::plantilla(cuerpo),
            encargo: "Expediente: 5".into(),
            catastro: Some(FuenteCatastro::Imagen(b"no es imagen".to_vec())),
            ..Solicitud::default()
        };
        let informe = generar(&solicitud, &Extractor::nuevo().unwrap()).unwrap();
        let documento = PaqueteDocx::leer(&informe.documento)
            .unwrap()
            .parte_texto(PARTE_DOCUMENTO)
            .unwrap();
        assert!(documento.contains(parrafos::MARCA_ERROR_IMAGEN));
        assert_eq!(informe.cambios.ranuras_imagen, 1);
    }

    #[test]
    fn solicitud_sin_plantilla() {
        let solicitud = Solicitud {
            encargo: "Expediente: 5".into(),
            ..Solicitud::default()
        };
        assert!(matches!(
            generar(&solicitud, &Extractor::nuevo().unwrap()),
            Err(Error::FaltaPlantilla)
        ));
    }

    #[test]
    fn guardar_en_carpeta() {
        let dir = tempfile::tempdir().unwrap();
        let informe = Informe {
            nombre: "Informe_1.docx".into(),
            campos: MapaCampos::vacio(),
            documento: b"contenido".to_vec(),
            cambios: Cambios::default(),
            reportaje: Reportaje::default(),
        };
        let ruta = guardar(&informe, dir.path()).unwrap();
        assert_eq!(ruta, dir.path().join("Informe_1.docx"));
        assert_eq!(std::fs::read(&ruta).unwrap(), b"contenido");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let otra = dir.path().join("otro.docx");
        assert_eq!(guardar(&informe, &otra).unwrap(), otra);
    }
}
