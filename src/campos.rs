//! Campos reconocidos en las plantillas y el mapa token → valor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Marcador del párrafo donde se inserta la imagen del catastro.
pub const TOKEN_IMAGEN_CATASTRO: &str = "{{IMAGEN_CATASTRO}}";

/// Campos que se sustituyen en la plantilla.
///
/// El conjunto es cerrado: cada variante tiene un token `{{NOMBRE}}` fijo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Campo {
    Expediente,
    NumSiniestro,
    Poliza,
    ModeloPoliza,
    Ramo,
    Compania,
    Tomador,
    Asegurado,
    Telefono,
    DireccionRiesgo,
    Cp,
    Poblacion,
    Provincia,
    FechaDeOcurrencia,
    FechaEncargo,
    FechaInforme,
    Causa,
    Descripcion,
    Tramitador,
    RefCatastral,
    DirCatastro,
    CpCatastro,
    MunicipioCatastro,
    ProvinciaCatastro,
    UsoCatastro,
    SuperficieCatastro,
    AnoConstruccion,
}

impl Campo {
    pub const TODOS: &'static [Self] = &[
        Self::Expediente,
        Self::NumSiniestro,
        Self::Poliza,
        Self::ModeloPoliza,
        Self::Ramo,
        Self::Compania,
        Self::Tomador,
        Self::Asegurado,
        Self::Telefono,
        Self::DireccionRiesgo,
        Self::Cp,
        Self::Poblacion,
        Self::Provincia,
        Self::FechaDeOcurrencia,
        Self::FechaEncargo,
        Self::FechaInforme,
        Self::Causa,
        Self::Descripcion,
        Self::Tramitador,
        Self::RefCatastral,
        Self::DirCatastro,
        Self::CpCatastro,
        Self::MunicipioCatastro,
        Self::ProvinciaCatastro,
        Self::UsoCatastro,
        Self::SuperficieCatastro,
        Self::AnoConstruccion,
    ];

    /// Nombre del campo tal como aparece dentro de las llaves.
    #[must_use]
    pub const fn nombre(self) -> &'static str {
        match self {
            Self::Expediente => "EXPEDIENTE",
            Self::NumSiniestro => "NUM_SINIESTRO",
            Self::Poliza => "POLIZA",
            Self::ModeloPoliza => "MODELO_POLIZA",
            Self::Ramo => "RAMO",
            Self::Compania => "COMPANIA",
            Self::Tomador => "TOMADOR",
            Self::Asegurado => "ASEGURADO",
            Self::Telefono => "TELEFONO",
            Self::DireccionRiesgo => "DIRECCION_RIESGO",
            Self::Cp => "CP",
            Self::Poblacion => "POBLACION",
            Self::Provincia => "PROVINCIA",
            Self::FechaDeOcurrencia => "FECHA_DE_OCURRENCIA",
            Self::FechaEncargo => "FECHA_ENCARGO",
            Self::FechaInforme => "FECHA_INFORME",
            Self::Causa => "CAUSA",
            Self::Descripcion => "DESCRIPCION",
            Self::Tramitador => "TRAMITADOR",
            Self::RefCatastral => "REF_CATASTRAL",
            Self::DirCatastro => "DIR_CATASTRO",
            Self::CpCatastro => "CP_CATASTRO",
            Self::MunicipioCatastro => "MUNICIPIO_CATASTRO",
            Self::ProvinciaCatastro => "PROVINCIA_CATASTRO",
            Self::UsoCatastro => "USO_CATASTRO",
            Self::SuperficieCatastro => "SUPERFICIE_CATASTRO",
            Self::AnoConstruccion => "ANO_CONSTRUCCION",
        }
    }

    /// Token completo, p. ej. `{{EXPEDIENTE}}`.
    #[must_use]
    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.nombre())
    }
}

impl fmt::Display for Campo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nombre())
    }
}

/// Valores extraídos para una generación.
///
/// Siempre contiene una entrada por cada [`Campo`]; un valor vacío significa
/// que el campo no se encontró.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapaCampos {
    valores: BTreeMap<Campo, String>,
}

impl MapaCampos {
    pub(crate) fn vacio() -> Self {
        Self {
            valores: Campo::TODOS.iter().map(|c| (*c, String::new())).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, campo: Campo) -> &str {
        self.valores.get(&campo).map_or("", String::as_str)
    }

    #[must_use]
    pub fn esta_vacio(&self, campo: Campo) -> bool {
        self.get(campo).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Campo, &str)> {
        self.valores.iter().map(|(c, v)| (*c, v.as_str()))
    }

    /// Número de campos con valor.
    #[must_use]
    pub fn rellenos(&self) -> usize {
        self.valores.values().filter(|v| !v.is_empty()).count()
    }

    pub(crate) fn fijar(&mut self, campo: Campo, valor: impl Into<String>) {
        self.valores.insert(campo, valor.into());
    }

    /// Copia `origen` en `destino` si `destino` está vacío.
    pub(crate) fn reflejar(&mut self, destino: Campo, origen: Campo) {
        if self.esta_vacio(destino) && !self.esta_vacio(origen) {
            let valor = self.get(origen).to_string();
            self.fijar(destino, valor);
        }
    }
}

impl Default for MapaCampos {
    fn default() -> Self {
        Self::vacio()
    }
}

impl FromIterator<(Campo, String)> for MapaCampos {
    fn from_iter<I: IntoIterator<Item = (Campo, String)>>(iter: I) -> Self {
        let mut mapa = Self::vacio();
        for (campo, valor) in iter {
            mapa.fijar(campo, valor);
        }
        mapa
    }
}

impl Serialize for MapaCampos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(c, v)| (c.token(), v)))
    }
}
