//! Fragmentos WordprocessingML que se añaden al documento.

use quick_xml::escape::escape;

/// EMU (English Metric Units) por pulgada.
pub const EMU_POR_PULGADA: u64 = 914_400;

const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Contador de identificadores `wp:docPr`, únicos en todo el documento.
#[derive(Debug)]
pub struct IdsDibujo(u32);

impl IdsDibujo {
    /// Empieza lejos de los identificadores que suele usar Word.
    #[must_use]
    pub const fn new() -> Self {
        Self(1000)
    }

    pub fn siguiente(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

impl Default for IdsDibujo {
    fn default() -> Self {
        Self::new()
    }
}

/// Imagen ya incluida en el paquete, lista para dibujarse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dibujo {
    pub relacion: String,
    pub ancho_emu: u64,
    pub alto_emu: u64,
}

impl Dibujo {
    /// Dibujo de `ancho_emu` de ancho manteniendo la proporción de la imagen.
    #[must_use]
    pub fn con_ancho(relacion: String, ancho_emu: u64, ancho_px: u32, alto_px: u32) -> Self {
        let alto_emu = if ancho_px == 0 {
            ancho_emu
        } else {
            ancho_emu * u64::from(alto_px) / u64::from(ancho_px)
        };
        Self {
            relacion,
            ancho_emu,
            alto_emu,
        }
    }

    /// Run con la imagen en línea.
    #[must_use]
    pub fn run(&self, ids: &mut IdsDibujo) -> String {
        let id = ids.siguiente();
        let (cx, cy) = (self.ancho_emu, self.alto_emu);
        let rid = escape(self.relacion.as_str());
        format!(
            concat!(
                r#"<w:r><w:drawing>"#,
                r#"<wp:inline xmlns:wp="{wp}" distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
                r#"<wp:docPr id="{id}" name="Imagen {id}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}">"#,
                r#"<pic:pic xmlns:pic="{pic}">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="0" name="imagen{id}.png"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip xmlns:r="{r}" r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline>"#,
                r#"</w:drawing></w:r>"#,
            ),
            wp = NS_WP,
            a = NS_A,
            pic = NS_PIC,
            r = NS_R,
            cx = cx,
            cy = cy,
            id = id,
            rid = rid,
        )
    }
}

/// Run de texto sin formato.
#[must_use]
pub fn run_texto(texto: &str) -> String {
    format!(
        r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(texto)
    )
}

/// Run de pie de foto: Calibri 9 pt.
#[must_use]
pub fn run_pie(texto: &str) -> String {
    format!(
        concat!(
            r#"<w:r><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/>"#,
            r#"<w:sz w:val="18"/><w:szCs w:val="18"/></w:rPr>"#,
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
        ),
        escape(texto)
    )
}

/// Párrafo centrado con los runs dados, opcionalmente con un estilo.
#[must_use]
pub fn parrafo_centrado(runs: &str, estilo: Option<&str>) -> String {
    let estilo = estilo
        .map(|e| format!(r#"<w:pStyle w:val="{}"/>"#, escape(e)))
        .unwrap_or_default();
    format!(r#"<w:p><w:pPr>{estilo}<w:jc w:val="center"/></w:pPr>{runs}</w:p>"#)
}

#[must_use]
pub fn parrafo_salto_pagina() -> String {
    r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#.to_string()
}

/// Título de sección. Sin estilo de título en la plantilla se usa negrita 14 pt.
#[must_use]
pub fn parrafo_titulo(texto: &str, estilo: Option<&str>) -> String {
    match estilo {
        Some(estilo) => format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr>{}</w:p>"#,
            escape(estilo),
            run_texto(texto)
        ),
        None => format!(
            concat!(
                r#"<w:p><w:r><w:rPr><w:b/><w:sz w:val="28"/><w:szCs w:val="28"/></w:rPr>"#,
                r#"<w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            ),
            escape(texto)
        ),
    }
}

/// Tabla sin bordes de columnas iguales. Cada celda es una lista de párrafos;
/// una celda vacía recibe un párrafo vacío.
#[must_use]
pub fn tabla(filas: &[Vec<String>], ancho_columna_twips: u32) -> String {
    let columnas = filas.iter().map(Vec::len).max().unwrap_or(0);
    let mut xml = String::from(concat!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:jc w:val="center"/>"#,
        r#"<w:tblLook w:val="04A0" w:firstRow="0" w:lastRow="0" w:firstColumn="0" w:lastColumn="0" w:noHBand="1" w:noVBand="1"/>"#,
        r#"</w:tblPr><w:tblGrid>"#,
    ));
    for _ in 0..columnas {
        xml.push_str(&format!(r#"<w:gridCol w:w="{ancho_columna_twips}"/>"#));
    }
    xml.push_str("</w:tblGrid>");
    for fila in filas {
        xml.push_str("<w:tr>");
        for celda in fila {
            xml.push_str(&format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="{ancho_columna_twips}" w:type="dxa"/></w:tcPr>"#
            ));
            if celda.is_empty() {
                xml.push_str("<w:p/>");
            } else {
                xml.push_str(celda);
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}
