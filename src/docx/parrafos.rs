//! Sustitución de tokens en los párrafos de una parte XML.
//!
//! La parte se lee como una lista de eventos de `quick_xml`. Cada `w:t` es un
//! run de texto para [`runs::reemplazar`]; su formato es la posición del
//! elemento en la lista, de modo que al reescribir solo cambia el contenido de
//! los `w:t` afectados y el resto del XML se copia tal cual.

use std::collections::{BTreeMap, HashMap};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{escape, Reader, Writer};
use regex::Regex;

use super::runs::{self, Run};
use super::xml::{self, Dibujo, IdsDibujo};
use crate::campos::{Campo, MapaCampos, TOKEN_IMAGEN_CATASTRO};
use crate::error::{Error, Result};

/// Texto que se deja donde una imagen no se pudo insertar.
pub const MARCA_ERROR_IMAGEN: &str = "[Error imagen]";

/// Pares token → valor de una generación.
#[derive(Debug)]
pub struct Sustitutor {
    valores: HashMap<String, String>,
    token: Regex,
}

impl Sustitutor {
    /// # Errors
    ///
    /// Solo falla si el patrón de tokens desconocidos no compila.
    pub fn nuevo(campos: &MapaCampos) -> Result<Self> {
        let valores = Campo::TODOS
            .iter()
            .map(|c| (c.token(), campos.get(*c).to_string()))
            .collect();
        Ok(Self {
            valores,
            token: Regex::new(r"\{\{[A-Z0-9_]+\}\}")?,
        })
    }

    /// Sustituye los tokens del párrafo y borra los que no tienen valor.
    ///
    /// Solo se buscan tokens en el texto original: un valor que contenga
    /// `{{...}}` se inserta tal cual. Devuelve los runs nuevos y el número de
    /// tokens sustituidos.
    fn aplicar<F>(&self, mut actuales: Vec<Run<F>>) -> (Vec<Run<F>>, usize) {
        let completo = runs::texto(&actuales);
        let apariciones: Vec<_> = self
            .token
            .find_iter(&completo)
            .filter(|m| m.as_str() != TOKEN_IMAGEN_CATASTRO)
            .collect();
        // De derecha a izquierda, para que las posiciones anteriores no cambien.
        for m in apariciones.iter().rev() {
            let valor = self.valores.get(m.as_str()).map_or_else(
                || {
                    log::warn!("Token sin valor en la plantilla: {}", m.as_str());
                    ""
                },
                String::as_str,
            );
            runs::reemplazar(&mut actuales, m.start(), m.end(), valor);
        }
        (actuales, apariciones.len())
    }
}

/// Contenido de los párrafos con `{{IMAGEN_CATASTRO}}`.
#[derive(Debug, Default, Clone, Copy)]
pub enum RanuraImagen<'a> {
    /// Sin imagen: el párrafo queda vacío.
    #[default]
    Vacia,
    Dibujo(&'a Dibujo),
    /// La imagen no se pudo leer: se deja la marca de error.
    Error,
}

/// Qué hacer con una parte además de sustituir tokens.
#[derive(Debug, Default)]
pub struct Ajustes<'a> {
    pub imagen_catastro: RanuraImagen<'a>,
    /// XML que se inserta al final del cuerpo, antes de `w:sectPr`.
    pub anexo: Option<&'a str>,
}

/// Recuento de cambios en una parte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cambios {
    pub tokens: usize,
    pub parrafos: usize,
    pub ranuras_imagen: usize,
}

/// `w:t` dentro de un párrafo: posiciones de apertura y cierre en la lista de
/// eventos (iguales para `<w:t/>`).
#[derive(Debug, Clone, Copy)]
struct Segmento {
    inicio: usize,
    fin: usize,
}

#[derive(Debug)]
struct Parrafo {
    inicio: usize,
    fin: usize,
    segmentos: Vec<Segmento>,
    /// `w:pPr` propio del párrafo: posiciones de apertura y cierre.
    propiedades: Option<(usize, usize)>,
}

/// Lo que se escribe en lugar de los eventos `inicio..=fin`.
#[derive(Debug)]
enum Reemplazo {
    Texto(String),
    Xml(String),
}

/// Procesa una parte XML completa.
///
/// # Errors
///
/// Falla si la parte no es XML bien formado.
pub fn procesar(
    parte: &str,
    sustitutor: &Sustitutor,
    ajustes: &Ajustes<'_>,
    ids: &mut IdsDibujo,
) -> Result<(String, Cambios)> {
    let eventos = leer_eventos(parte)?;
    let (parrafos, insercion) = localizar_parrafos(&eventos);

    let mut cambios = Cambios::default();
    let mut reemplazos: BTreeMap<usize, (usize, Reemplazo)> = BTreeMap::new();
    let mut anulados: Vec<(usize, usize)> = Vec::new();

    for parrafo in &parrafos {
        let actuales: Vec<Run<usize>> = parrafo
            .segmentos
            .iter()
            .enumerate()
            .map(|(i, s)| Ok(Run::new(texto_segmento(&eventos, *s)?, i)))
            .collect::<Result<_>>()?;
        let completo = runs::texto(&actuales);
        if !completo.contains("{{") {
            continue;
        }

        if completo.contains(TOKEN_IMAGEN_CATASTRO) {
            let contenido = match ajustes.imagen_catastro {
                RanuraImagen::Dibujo(dibujo) => dibujo.run(ids),
                RanuraImagen::Error => xml::run_texto(MARCA_ERROR_IMAGEN),
                RanuraImagen::Vacia => String::new(),
            };
            let nuevo = parrafo_imagen(&eventos, parrafo, &contenido)?;
            reemplazos.insert(parrafo.inicio, (parrafo.fin, Reemplazo::Xml(nuevo)));
            anulados.push((parrafo.inicio, parrafo.fin));
            cambios.ranuras_imagen += 1;
            continue;
        }

        let (nuevos, tokens) = sustitutor.aplicar(actuales.clone());
        if tokens == 0 {
            continue;
        }
        cambios.tokens += tokens;
        cambios.parrafos += 1;
        for (antes, despues) in actuales.iter().zip(&nuevos) {
            if antes.texto != despues.texto {
                let segmento = parrafo.segmentos[despues.formato];
                reemplazos.insert(
                    segmento.inicio,
                    (segmento.fin, Reemplazo::Texto(despues.texto.clone())),
                );
            }
        }
    }

    // Un párrafo sustituido entero se lleva por delante lo que tuviera dentro.
    reemplazos.retain(|inicio, _| !anulados.iter().any(|(a, b)| *inicio > *a && *inicio <= *b));

    let salida = escribir(&eventos, &reemplazos, insercion.zip(ajustes.anexo))?;
    Ok((salida, cambios))
}

/// Valor de un atributo, sin escapar.
pub(crate) fn atributo(elemento: &BytesStart<'_>, clave: &[u8]) -> Option<String> {
    elemento
        .attributes()
        .filter_map(std::result::Result::ok)
        .find(|a| a.key.as_ref() == clave)
        .and_then(|a| {
            escape::unescape(&String::from_utf8_lossy(&a.value))
                .ok()
                .map(|v| v.into_owned())
        })
}

fn leer_eventos(parte: &str) -> Result<Vec<Event<'static>>> {
    let mut reader = Reader::from_str(parte);
    let mut eventos = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            evento => eventos.push(evento.into_owned()),
        }
    }
    Ok(eventos)
}

/// Párrafos con sus `w:t`, y el punto donde se inserta el anexo: el
/// `w:sectPr` final del cuerpo o, si no lo hay, el cierre de `w:body`.
fn localizar_parrafos(eventos: &[Event<'_>]) -> (Vec<Parrafo>, Option<usize>) {
    let mut parrafos: Vec<Parrafo> = Vec::new();
    let mut abiertos: Vec<usize> = Vec::new();
    let mut pila: Vec<Vec<u8>> = Vec::new();
    let mut texto_abierto: Option<usize> = None;
    let mut insercion = None;

    for (i, evento) in eventos.iter().enumerate() {
        match evento {
            Event::Start(e) => {
                let nombre = e.name().as_ref().to_vec();
                match nombre.as_slice() {
                    b"w:p" => {
                        abiertos.push(parrafos.len());
                        parrafos.push(Parrafo {
                            inicio: i,
                            fin: i,
                            segmentos: Vec::new(),
                            propiedades: None,
                        });
                    }
                    b"w:pPr" if pila.last().is_some_and(|n| n == b"w:p") => {
                        if let Some(p) = abiertos.last() {
                            parrafos[*p].propiedades = Some((i, i));
                        }
                    }
                    b"w:t" => texto_abierto = Some(i),
                    b"w:sectPr" if es_hijo_de_body(&pila) => insercion = Some(i),
                    _ => {}
                }
                pila.push(nombre);
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => parrafos.push(Parrafo {
                    inicio: i,
                    fin: i,
                    segmentos: Vec::new(),
                    propiedades: None,
                }),
                b"w:t" => {
                    if let Some(p) = abiertos.last() {
                        parrafos[*p].segmentos.push(Segmento { inicio: i, fin: i });
                    }
                }
                b"w:pPr" if pila.last().is_some_and(|n| n == b"w:p") => {
                    if let Some(p) = abiertos.last() {
                        parrafos[*p].propiedades = Some((i, i));
                    }
                }
                b"w:sectPr" if es_hijo_de_body(&pila) => insercion = Some(i),
                _ => {}
            },
            Event::End(e) => {
                match e.name().as_ref() {
                    b"w:p" => {
                        if let Some(p) = abiertos.pop() {
                            parrafos[p].fin = i;
                        }
                    }
                    b"w:pPr" => {
                        if let Some(p) = abiertos.last() {
                            if let Some((_, fin)) = parrafos[*p].propiedades.as_mut() {
                                *fin = i;
                            }
                        }
                    }
                    b"w:t" => {
                        if let (Some(inicio), Some(p)) = (texto_abierto.take(), abiertos.last()) {
                            parrafos[*p].segmentos.push(Segmento { inicio, fin: i });
                        }
                    }
                    b"w:body" if insercion.is_none() => insercion = Some(i),
                    _ => {}
                }
                pila.pop();
            }
            _ => {}
        }
    }

    (parrafos, insercion)
}

fn es_hijo_de_body(pila: &[Vec<u8>]) -> bool {
    pila.last().is_some_and(|n| n == b"w:body")
}

fn texto_segmento(eventos: &[Event<'_>], segmento: Segmento) -> Result<String> {
    let mut texto = String::new();
    for evento in &eventos[segmento.inicio..=segmento.fin] {
        match evento {
            Event::Text(t) => texto.push_str(&t.unescape()?),
            Event::CData(c) => texto.push_str(&String::from_utf8_lossy(c)),
            _ => {}
        }
    }
    Ok(texto)
}

fn escribir(
    eventos: &[Event<'_>],
    reemplazos: &BTreeMap<usize, (usize, Reemplazo)>,
    anexo: Option<(usize, &str)>,
) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    let mut i = 0;
    while i < eventos.len() {
        if let Some((posicion, fragmento)) = anexo {
            if posicion == i {
                writer.write_event(Event::Text(BytesText::from_escaped(fragmento)))?;
            }
        }
        match reemplazos.get(&i) {
            Some((fin, Reemplazo::Texto(texto))) => {
                escribir_texto(&mut writer, texto)?;
                i = fin + 1;
            }
            Some((fin, Reemplazo::Xml(fragmento))) => {
                writer.write_event(Event::Text(BytesText::from_escaped(fragmento.as_str())))?;
                i = fin + 1;
            }
            None => {
                writer.write_event(&eventos[i])?;
                i += 1;
            }
        }
    }
    String::from_utf8(writer.into_inner())
        .map_err(|_| Error::PlantillaInvalida("XML resultante no es UTF-8".into()))
}

/// Elementos de `w:pPr` que van detrás de `w:jc`.
const DETRAS_DE_JC: &[&[u8]] = &[
    b"w:textDirection",
    b"w:textAlignment",
    b"w:textboxTightWrap",
    b"w:outlineLvl",
    b"w:divId",
    b"w:cnfStyle",
    b"w:rPr",
    b"w:sectPr",
    b"w:pPrChange",
];

/// Párrafo de la ranura de imagen: la misma apertura y las mismas
/// propiedades (estilo, salto de sección...) centradas, con `contenido` como
/// único run.
fn parrafo_imagen(eventos: &[Event<'_>], parrafo: &Parrafo, contenido: &str) -> Result<String> {
    const CENTRADO: &str = r#"<w:jc w:val="center"/>"#;

    let mut writer = Writer::new(Vec::new());
    writer.write_event(&eventos[parrafo.inicio])?;
    match parrafo.propiedades {
        Some((inicio, fin)) if inicio < fin => {
            let mut nivel = 0usize;
            let mut centrado = false;
            for (k, evento) in eventos[inicio..=fin].iter().enumerate() {
                let hijo = nivel == 1;
                let nombre = match evento {
                    Event::Start(e) | Event::Empty(e) => Some(e.name().as_ref().to_vec()),
                    _ => None,
                };
                if hijo && !centrado {
                    let detras = nombre.as_deref().is_some_and(|n| DETRAS_DE_JC.contains(&n));
                    if detras || inicio + k == fin {
                        writer.write_event(Event::Text(BytesText::from_escaped(CENTRADO)))?;
                        centrado = true;
                    }
                }
                let alineacion = matches!(evento, Event::Empty(_))
                    && nombre.as_deref() == Some(b"w:jc".as_slice());
                if !(hijo && alineacion) {
                    writer.write_event(evento)?;
                }
                match evento {
                    Event::Start(_) => nivel += 1,
                    Event::End(_) => nivel = nivel.saturating_sub(1),
                    _ => {}
                }
            }
        }
        _ => writer.write_event(Event::Text(BytesText::from_escaped(format!(
            "<w:pPr>{CENTRADO}</w:pPr>"
        ))))?,
    }
    writer.write_event(Event::Text(BytesText::from_escaped(contenido)))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    String::from_utf8(writer.into_inner())
        .map_err(|_| Error::PlantillaInvalida("XML resultante no es UTF-8".into()))
}

fn escribir_texto(writer: &mut Writer<Vec<u8>>, texto: &str) -> Result<()> {
    if texto.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("w:t")))?;
    } else {
        let mut inicio = BytesStart::new("w:t");
        inicio.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(inicio))?;
        writer.write_event(Event::Text(BytesText::new(texto)))?;
        writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    }
    Ok(())
}
