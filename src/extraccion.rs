//! Extracción de campos del texto del encargo y del catastro.
//!
//! Cada entrada de las tablas es un patrón con un único grupo de captura. Se
//! hace una sola búsqueda sin distinguir mayúsculas sobre todo el texto: la
//! primera coincidencia manda y el grupo 1 se guarda recortado. Si no hay
//! coincidencia el campo queda vacío; nunca es un error.
//!
//! Convenciones de los patrones:
//!
//! * "resto de línea": `([^\r\n\t]+?)` perezoso hasta fin de línea, un
//!   tabulador o dos espacios seguidos (texto pegado en columnas).
//! * fechas: `d[d]/m[m]/aa[aa]` con `/`, `-` o `.` como separador.
//! * referencias: alfanumérico que empieza y acaba en letra o dígito y puede
//!   llevar `-`, `/` o `.` en medio.

use regex::Regex;

use crate::campos::{Campo, MapaCampos};
use crate::error::Result;

/// Transformación aplicada al valor recortado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postproceso {
    Ninguno,
    /// Año de dos dígitos al final de una fecha → `20aa`.
    FechaCuatroDigitos,
    /// Cualquier secuencia de espacios o saltos de línea → un espacio.
    ColapsarEspacios,
    Mayusculas,
}

impl Postproceso {
    fn aplicar(self, valor: &str) -> String {
        match self {
            Self::Ninguno => valor.to_string(),
            Self::FechaCuatroDigitos => normalizar_año(valor),
            Self::ColapsarEspacios => valor.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::Mayusculas => valor.to_uppercase(),
        }
    }
}

/// Entrada de una tabla de extracción.
#[derive(Debug, Clone, Copy)]
pub struct Patron {
    pub campo: Campo,
    pub expresion: &'static str,
    pub postproceso: Postproceso,
}

const fn patron(campo: Campo, expresion: &'static str, postproceso: Postproceso) -> Patron {
    Patron {
        campo,
        expresion,
        postproceso,
    }
}

/// Campos del texto del encargo.
pub const TABLA_ENCARGO: &[Patron] = &[
    // "Expediente: 2024-001", "Expediente Nº 2024/001"
    patron(
        Campo::Expediente,
        r"(?i)\bexpediente\s*(?:n(?:º|°|o\.)\s*:?|:)\s*([0-9a-z](?:[0-9a-z/.\-]*[0-9a-z])?)",
        Postproceso::Ninguno,
    ),
    // "Siniestro Nº: S-88", "Nº de siniestro: S-88"
    patron(
        Campo::NumSiniestro,
        r"(?i)(?:\bsiniestro\s*n(?:º|°|o\.)|\bn(?:º|°|o\.)\s*(?:de\s+)?siniestro)\s*:?\s*([0-9a-z](?:[0-9a-z/\-]*[0-9a-z])?)",
        Postproceso::Mayusculas,
    ),
    // Al inicio de línea, tras un separador o tras "Número de" / "Nº", para
    // no confundirse con "Modelo de póliza:".
    patron(
        Campo::Poliza,
        r"(?im)(?:^|[;,|\t]|\s{2}|\bn[úu]mero\s+de\s+|\bn(?:º|°|o\.)\s*(?:de\s+)?)\s*p[óo]liza\s*(?:n(?:º|°|o\.)\s*)?:\s*([0-9a-z](?:[0-9a-z/\-]*[0-9a-z])?)",
        Postproceso::Mayusculas,
    ),
    patron(
        Campo::ModeloPoliza,
        r"(?i)\bmodelo(?:\s+de\s+p[óo]liza)?\s*:\s*([0-9a-z](?:[0-9a-z\-]*[0-9a-z])?)",
        Postproceso::Mayusculas,
    ),
    patron(
        Campo::Compania,
        r"(?i)\b(?:compa[ñn][íi]a(?:\s+aseguradora)?|aseguradora)\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Tomador,
        r"(?i)\btomador(?:\s+del\s+seguro)?\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Asegurado,
        r"(?i)\basegurado\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    // Nueve cifras con espacios o puntos, con prefijo +34 opcional.
    patron(
        Campo::Telefono,
        r"(?i)\btel[ée]fonos?(?:\s+de\s+contacto)?\s*:\s*((?:\+?34[ .]?)?\d(?:[ .]?\d){8})\b",
        Postproceso::ColapsarEspacios,
    ),
    patron(
        Campo::DireccionRiesgo,
        r"(?i)\b(?:direcci[óo]n|situaci[óo]n)\s+del\s+riesgo\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::ColapsarEspacios,
    ),
    patron(
        Campo::Cp,
        r"(?i)(?:\bc\.?\s?p\b\.?|\bc[óo]digo\s+postal)\s*:?\s*(\d{5})\b",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Poblacion,
        r"(?i)\b(?:poblaci[óo]n|localidad|municipio)\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Provincia,
        r"(?i)\bprovincia\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::FechaDeOcurrencia,
        r"(?i)\bfecha\s+(?:de(?:l)?\s+)?(?:ocurrencia|siniestro)\s*:?\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2}(?:\d{2})?)\b",
        Postproceso::FechaCuatroDigitos,
    ),
    patron(
        Campo::FechaEncargo,
        r"(?i)\bfecha\s+(?:de(?:l)?\s+)?encargo\s*:?\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2}(?:\d{2})?)\b",
        Postproceso::FechaCuatroDigitos,
    ),
    patron(
        Campo::Causa,
        r"(?i)\b(?:causa(?:\s+del\s+siniestro)?|tipo\s+de\s+siniestro)\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Descripcion,
        r"(?i)\bdescripci[óo]n(?:\s+del\s+siniestro)?\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::Tramitador,
        r"(?i)\btramitadora?\s*:\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
];

/// Campos de la "Consulta descriptiva y gráfica de datos catastrales".
///
/// El bloque de localización tiene la forma
/// `<vía> <CP> <MUNICIPIO> (<PROVINCIA>)`, normalmente en dos líneas.
pub const TABLA_CATASTRO: &[Patron] = &[
    // 20 caracteres, o los 14 de la parcela si el PDF no trae el resto.
    patron(
        Campo::RefCatastral,
        r"(?i)\breferencia\s+catastral(?:\s+del\s+inmueble)?\s*:?\s*([0-9a-z]{20}|[0-9a-z]{14})",
        Postproceso::Mayusculas,
    ),
    // Perezoso hasta el primer código postal.
    patron(
        Campo::DirCatastro,
        r"(?is)\blocalizaci[óo]n\s*:?\s*(.+?)\s*\b\d{5}\s",
        Postproceso::ColapsarEspacios,
    ),
    patron(
        Campo::CpCatastro,
        r"(?is)\blocalizaci[óo]n\s*:?\s*.+?\b(\d{5})\s",
        Postproceso::Ninguno,
    ),
    // Entre el código postal y el paréntesis de la provincia.
    patron(
        Campo::MunicipioCatastro,
        r"(?is)\blocalizaci[óo]n\s*:?\s*.+?\b\d{5}\s+([^(\r\n]+?)\s*\(",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::ProvinciaCatastro,
        r"(?is)\blocalizaci[óo]n\s*:?\s*.+?\b\d{5}\s+[^(\r\n]*\(([^)\r\n]+)\)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::UsoCatastro,
        r"(?i)\buso\s+principal\s*:?\s*([^\r\n\t]+?)(?:[ \t]{2,}|\t|\r|\n|$)",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::SuperficieCatastro,
        r"(?i)\bsuperficie\s+construida\s*:?\s*(\d[\d.,]*)\s*m",
        Postproceso::Ninguno,
    ),
    patron(
        Campo::AnoConstruccion,
        r"(?i)\ba[ñn]o\s+(?:de\s+)?construcci[óo]n\s*:?\s*(\d{4})\b",
        Postproceso::Ninguno,
    ),
];

/// Campos que copian a otro cuando quedan vacíos: `(destino, origen)`.
const REFLEJOS: &[(Campo, Campo)] = &[
    (Campo::Asegurado, Campo::Tomador),
    (Campo::DirCatastro, Campo::DireccionRiesgo),
    (Campo::ProvinciaCatastro, Campo::Provincia),
    (Campo::MunicipioCatastro, Campo::Poblacion),
    (Campo::CpCatastro, Campo::Cp),
];

/// Tabla de patrones ya compilados.
#[derive(Debug)]
pub struct TablaCampos {
    entradas: Vec<(Campo, Regex, Postproceso)>,
}

impl TablaCampos {
    /// # Errors
    ///
    /// Devuelve [`crate::Error::Regex`] si algún patrón no compila.
    pub fn compilar(patrones: &[Patron]) -> Result<Self> {
        let entradas = patrones
            .iter()
            .map(|p| Ok((p.campo, Regex::new(p.expresion)?, p.postproceso)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entradas })
    }

    /// Aplica cada patrón a `texto` y guarda el resultado en `mapa`.
    ///
    /// Los campos sin coincidencia se guardan vacíos.
    pub fn aplicar(&self, texto: &str, mapa: &mut MapaCampos) {
        let mut encontrados = 0usize;
        for (campo, expresion, postproceso) in &self.entradas {
            let valor = expresion
                .captures(texto)
                .and_then(|c| c.get(1))
                .map(|m| postproceso.aplicar(m.as_str().trim()))
                .unwrap_or_default();
            if !valor.is_empty() {
                encontrados += 1;
            }
            log::debug!("{campo}: {valor:?}");
            mapa.fijar(*campo, valor);
        }
        log::debug!("{} de {} campos encontrados", encontrados, self.entradas.len());
    }
}

/// Extractor con las dos tablas fijas del generador.
#[derive(Debug)]
pub struct Extractor {
    encargo: TablaCampos,
    catastro: TablaCampos,
}

impl Extractor {
    /// Compila todas las tablas.
    ///
    /// # Errors
    ///
    /// Devuelve [`crate::Error::Regex`] si algún patrón no compila.
    pub fn nuevo() -> Result<Self> {
        Ok(Self {
            encargo: TablaCampos::compilar(TABLA_ENCARGO)?,
            catastro: TablaCampos::compilar(TABLA_CATASTRO)?,
        })
    }

    /// Extrae los campos del encargo y, si lo hay, del texto del catastro, y
    /// aplica las derivaciones entre campos.
    #[must_use]
    pub fn extraer(&self, encargo: &str, catastro: Option<&str>) -> MapaCampos {
        let mut mapa = MapaCampos::vacio();
        self.encargo.aplicar(encargo, &mut mapa);
        if let Some(texto) = catastro {
            self.catastro.aplicar(texto, &mut mapa);
        }
        for (destino, origen) in REFLEJOS {
            mapa.reflejar(*destino, *origen);
        }
        log::info!("Campos extraídos: {} de {}", mapa.rellenos(), Campo::TODOS.len());
        mapa
    }
}

/// Pasa a cuatro cifras el año de dos de una fecha (`05/06/23` → `05/06/2023`).
fn normalizar_año(fecha: &str) -> String {
    match fecha.rfind(['/', '-', '.']) {
        Some(pos) => {
            let (dia_mes, año) = fecha.split_at(pos + 1);
            if año.len() == 2 && año.chars().all(|c| c.is_ascii_digit()) {
                format!("{dia_mes}20{año}")
            } else {
                fecha.to_string()
            }
        }
        None => fecha.to_string(),
    }
}
