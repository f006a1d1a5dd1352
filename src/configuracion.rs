//! Ajustes persistentes: plantillas y hoja de pólizas.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fichero de ajustes en el directorio de trabajo.
pub const RUTA_POR_DEFECTO: &str = "generador_ts.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuracion {
    /// Plantilla Word para encargos ordinarios.
    pub plantilla_base: Option<PathBuf>,
    /// Plantilla Word para encargos con defensa jurídica.
    pub plantilla_juridica: Option<PathBuf>,
    /// Excel de modelos de póliza y ramos.
    pub hoja_polizas: Option<PathBuf>,
}

impl Configuracion {
    /// Lee los ajustes; si el fichero no existe devuelve los valores por
    /// defecto.
    ///
    /// # Errors
    ///
    /// Falla si el fichero existe pero no se puede leer o no es JSON válido.
    pub fn cargar(ruta: &Path) -> Result<Self> {
        match std::fs::read_to_string(ruta) {
            Ok(texto) => Ok(serde_json::from_str(&texto)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "Sin configuración en {}, se usan valores por defecto",
                    ruta.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Falla si el fichero no se puede escribir.
    pub fn guardar(&self, ruta: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(ruta, json)?;
        log::info!("Configuración guardada en {}", ruta.display());
        Ok(())
    }

    /// Plantilla configurada para el tipo de encargo.
    #[must_use]
    pub fn plantilla(&self, juridico: bool) -> Option<&Path> {
        if juridico {
            self.plantilla_juridica.as_deref()
        } else {
            self.plantilla_base.as_deref()
        }
    }
}
