//! Generación completa de un informe sobre una plantilla construida en memoria.

use std::io::{Cursor, Read, Write};

use generador_ts::docx::parrafos::MARCA_ERROR_IMAGEN;
use generador_ts::{
    generar, guardar, Campo, Configuracion, Entradas, Error, Extractor, Foto, FuenteCatastro,
    LoteFotos, Pie, Solicitud,
};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const ENCARGO: &str = "\
Expediente: 2024-001
Compañía: Seguros Ejemplo S.A.
Póliza: HG-778812
Tomador: JUAN PÉREZ LÓPEZ
Dirección del riesgo: CL MAYOR 12, 2º B
Población: Villanueva
Fecha de ocurrencia: 03/02/24
";

fn documento() -> String {
    let cuerpo = concat!(
        r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Expediente: {{EXPE</w:t></w:r>"#,
        r#"<w:r><w:t>DIENTE}}</w:t></w:r></w:p>"#,
        r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Asegurado: {{ASEGURADO}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        r#"<w:p><w:r><w:t>{{IMAGEN_CATASTRO}}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t xml:space="preserve">Dato: {{NO_EXISTE}} fin</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t xml:space="preserve">Ocurrencia: {{FECHA_DE_OCURRENCIA}}</w:t></w:r></w:p>"#,
    );
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{NS_W}"><w:body>{cuerpo}<w:sectPr/></w:body></w:document>"#
    )
}

fn plantilla() -> Vec<u8> {
    let partes = [
        (
            "[Content_Types].xml",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"</Types>"#,
            )
            .to_string(),
        ),
        ("word/document.xml", documento()),
        (
            "word/_rels/document.xml.rels",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"</Relationships>"#,
            )
            .to_string(),
        ),
        (
            "word/header1.xml",
            format!(r#"<w:hdr xmlns:w="{NS_W}"><w:p><w:r><w:t>Exp. {{{{EXPEDIENTE}}}}</w:t></w:r></w:p></w:hdr>"#),
        ),
    ];
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (nombre, contenido) in &partes {
        zip.start_file(*nombre, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(contenido.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn png(ancho: u32, alto: u32) -> Vec<u8> {
    let imagen = image::RgbImage::from_pixel(ancho, alto, image::Rgb([40, 160, 60]));
    let mut bytes = Vec::new();
    imagen
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn partes(docx: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archivo = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    (0..archivo.len())
        .map(|i| {
            let mut entrada = archivo.by_index(i).unwrap();
            let mut datos = Vec::new();
            entrada.read_to_end(&mut datos).unwrap();
            (entrada.name().to_string(), datos)
        })
        .collect()
}

fn parte(partes: &[(String, Vec<u8>)], nombre: &str) -> String {
    let (_, datos) = partes.iter().find(|(n, _)| n == nombre).unwrap();
    String::from_utf8(datos.clone()).unwrap()
}

#[test]
fn informe_completo() {
    let mut fotos: Vec<Foto> = (0..6)
        .map(|i| Foto::new(format!("foto{i}.png"), png(300, 200), Some(Pie::VistaGeneral)))
        .collect();
    fotos.insert(3, Foto::new("rota.jpg", b"no es una foto".to_vec(), None));

    let solicitud = Solicitud {
        plantilla: plantilla(),
        encargo: ENCARGO.to_string(),
        catastro: Some(FuenteCatastro::Imagen(png(640, 480))),
        ramos: None,
        fotos: LoteFotos::new(fotos).unwrap(),
        fecha_informe: "10/03/2024".to_string(),
    };
    let informe = generar(&solicitud, &Extractor::nuevo().unwrap()).unwrap();

    assert_eq!(informe.nombre, "Informe_2024-001.docx");
    assert_eq!(informe.campos.get(Campo::Asegurado), "JUAN PÉREZ LÓPEZ");
    assert_eq!(informe.reportaje.insertadas, 6);
    assert_eq!(informe.reportaje.fallidas, 1);
    assert_eq!(informe.reportaje.cuadriculas, 2);
    assert_eq!(informe.cambios.ranuras_imagen, 1);

    let partes = partes(&informe.documento);
    let documento = parte(&partes, "word/document.xml");
    assert!(!documento.contains("{{"), "quedan tokens: {documento}");
    assert!(documento.contains("Expediente: 2024-001"));
    assert!(documento.contains("Asegurado: JUAN PÉREZ LÓPEZ"));
    assert!(documento.contains("Dato:  fin"));
    assert!(documento.contains("Ocurrencia: 03/02/2024"));
    assert!(documento.contains("Reportaje fotográfico"));
    assert_eq!(documento.matches("<w:tbl>").count(), 3);
    assert_eq!(documento.matches("<w:drawing>").count(), 7);
    assert_eq!(documento.matches(MARCA_ERROR_IMAGEN).count(), 1);
    assert_eq!(documento.matches("Vista general").count(), 6);
    assert!(documento.find("Reportaje fotográfico") < documento.find("<w:sectPr/>"));

    let cabecera = parte(&partes, "word/header1.xml");
    assert!(cabecera.contains("Exp. 2024-001"));

    let medios = partes
        .iter()
        .filter(|(n, _)| n.starts_with("word/media/"))
        .count();
    assert_eq!(medios, 7);
    let relaciones = parte(&partes, "word/_rels/document.xml.rels");
    assert_eq!(relaciones.matches("rIdInforme").count(), 7);
    assert!(parte(&partes, "[Content_Types].xml").contains(r#"Extension="png""#));

    let dir = tempfile::tempdir().unwrap();
    let ruta = guardar(&informe, dir.path()).unwrap();
    assert_eq!(ruta, dir.path().join("Informe_2024-001.docx"));
    let ficheros: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(ficheros.len(), 1);
}

#[test]
fn sin_tokens_la_plantilla_queda_igual() {
    let cuerpo = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{NS_W}"><w:body><w:p><w:r><w:t>Texto fijo</w:t></w:r></w:p></w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(cuerpo.as_bytes()).unwrap();
    let plantilla = zip.finish().unwrap().into_inner();

    let solicitud = Solicitud {
        plantilla,
        encargo: "Sin datos reconocibles".to_string(),
        ..Solicitud::default()
    };
    let informe = generar(&solicitud, &Extractor::nuevo().unwrap()).unwrap();
    assert_eq!(informe.nombre, "informe_generado.docx");
    assert_eq!(parte(&partes(&informe.documento), "word/document.xml"), cuerpo);
}

#[test]
fn entradas_obligatorias() {
    let config = Configuracion::default();
    let sin_plantilla = Entradas {
        encargo: Some(ENCARGO.to_string()),
        ..Entradas::default()
    };
    assert!(matches!(
        sin_plantilla.cargar(&config),
        Err(Error::FaltaPlantilla)
    ));

    let dir = tempfile::tempdir().unwrap();
    let ruta = dir.path().join("plantilla.docx");
    std::fs::write(&ruta, plantilla()).unwrap();
    let sin_encargo = Entradas {
        plantilla: Some(ruta.clone()),
        ..Entradas::default()
    };
    assert!(matches!(sin_encargo.cargar(&config), Err(Error::FaltaEncargo)));

    let demasiadas = Entradas {
        plantilla: Some(ruta),
        encargo: Some(ENCARGO.to_string()),
        fotos: vec![(dir.path().join("x.jpg"), None); generador_ts::MAX_FOTOS + 1],
        ..Entradas::default()
    };
    assert!(matches!(
        demasiadas.cargar(&config),
        Err(Error::DemasiadasFotos { .. })
    ));
}
