//! Hoja Excel de modelos de póliza: columna A el código de modelo, columna B
//! el ramo.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::error::{Error, Result};

/// Tabla código de modelo → ramo.
#[derive(Debug, Clone, Default)]
pub struct TablaRamos {
    ramos: HashMap<String, String>,
}

impl TablaRamos {
    /// Lee la primera hoja del libro. Las filas sin código o sin ramo se
    /// ignoran, lo que también descarta una cabecera vacía.
    ///
    /// # Errors
    ///
    /// Falla si el libro no se puede abrir o no tiene hojas.
    pub fn cargar(ruta: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(ruta)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::PolizasVacias(ruta.to_path_buf()))??;

        let ramos: HashMap<String, String> = range
            .rows()
            .filter_map(|fila| {
                let codigo = normalizar(&texto_celda(fila.first()?));
                let ramo = texto_celda(fila.get(1)?).trim().to_string();
                (!codigo.is_empty() && !ramo.is_empty()).then_some((codigo, ramo))
            })
            .collect();
        log::info!("Tabla de ramos: {} modelos", ramos.len());
        Ok(Self { ramos })
    }

    /// Ramo del modelo, sin distinguir mayúsculas ni espacios alrededor.
    #[must_use]
    pub fn buscar(&self, modelo: &str) -> Option<&str> {
        self.ramos.get(&normalizar(modelo)).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ramos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ramos.is_empty()
    }
}

impl FromIterator<(String, String)> for TablaRamos {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            ramos: iter
                .into_iter()
                .map(|(codigo, ramo)| (normalizar(&codigo), ramo))
                .collect(),
        }
    }
}

/// Los códigos numéricos llegan como `1234.0`; se comparan como `1234`.
fn texto_celda(celda: &Data) -> String {
    match celda {
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        Data::Empty => String::new(),
        otro => otro.to_string(),
    }
}

fn normalizar(codigo: &str) -> String {
    codigo.trim().to_uppercase()
}
