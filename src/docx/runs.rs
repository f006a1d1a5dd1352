//! Sustitución de tokens repartidos entre runs.
//!
//! Word guarda el texto visible de un párrafo como una secuencia de runs con
//! formato propio, y un token como `{{EXPEDIENTE}}` puede quedar partido entre
//! varios. La sustitución trabaja sobre el texto concatenado y devuelve la
//! misma lista de runs: el valor se escribe en el run donde empieza el token,
//! los runs intermedios y el del final quedan vacíos pero no se eliminan.

/// Fragmento de texto con el formato que le acompaña.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<F> {
    pub texto: String,
    pub formato: F,
}

impl<F> Run<F> {
    pub fn new(texto: impl Into<String>, formato: F) -> Self {
        Self {
            texto: texto.into(),
            formato,
        }
    }
}

/// Texto visible: concatenación de los runs en orden.
#[must_use]
pub fn texto<F>(runs: &[Run<F>]) -> String {
    runs.iter().map(|r| r.texto.as_str()).collect()
}

/// Sustituye todas las apariciones de `token` por `valor`, de izquierda a
/// derecha.
///
/// El resultado tiene los mismos runs, con el mismo formato y en el mismo
/// orden; solo cambia su texto. Si el token no aparece se devuelve una copia
/// idéntica.
#[must_use]
pub fn sustituir<F: Clone>(runs: &[Run<F>], token: &str, valor: &str) -> Vec<Run<F>> {
    let mut salida = runs.to_vec();
    if token.is_empty() {
        return salida;
    }

    let mut desde = 0;
    loop {
        let completo = texto(&salida);
        let Some(relativo) = completo[desde..].find(token) else {
            break;
        };
        let inicio = desde + relativo;
        reemplazar(&mut salida, inicio, inicio + token.len(), valor);

        // Seguir después del valor: si el valor contiene el token no se
        // vuelve a sustituir.
        desde = inicio + valor.len();
    }

    salida
}

/// Sustituye los bytes `inicio..fin` del texto concatenado por `valor`.
///
/// El valor se escribe en el run donde empieza el rango; lo que quede del
/// rango en los runs siguientes se borra. Un rango vacío o fuera del texto no
/// cambia nada.
pub fn reemplazar<F>(runs: &mut [Run<F>], inicio: usize, fin: usize, valor: &str) {
    let total: usize = runs.iter().map(|r| r.texto.len()).sum();
    if inicio >= fin || fin > total {
        return;
    }

    let (run_inicio, base_inicio) = localizar(runs, inicio);
    let (run_fin, base_fin) = localizar(runs, fin - 1);

    let sufijo = runs[run_fin].texto[fin - base_fin..].to_string();
    let mut nuevo = runs[run_inicio].texto[..inicio - base_inicio].to_string();
    nuevo.push_str(valor);
    nuevo.push_str(&sufijo);
    runs[run_inicio].texto = nuevo;
    for run in &mut runs[run_inicio + 1..=run_fin] {
        run.texto.clear();
    }
}

/// Run que contiene el byte `posicion` del texto concatenado y desplazamiento
/// de ese run dentro del texto.
fn localizar<F>(runs: &[Run<F>], posicion: usize) -> (usize, usize) {
    let mut base = 0;
    for (i, run) in runs.iter().enumerate() {
        let largo = run.texto.len();
        if posicion < base + largo {
            return (i, base);
        }
        base += largo;
    }
    // `posicion` siempre cae dentro del texto.
    (runs.len().saturating_sub(1), base)
}
