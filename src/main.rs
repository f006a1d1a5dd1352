//! Generador de informes de siniestros.
//!
//! ```text
//! generador-ts generar --encargo encargo.txt --catastro catastro.pdf \
//!     --foto salon.jpg=estancia --foto fachada.jpg --salida informes/
//! generador-ts config --plantilla-base base.docx --polizas polizas.xlsx
//! generador-ts interactivo
//! ```
//!
//! Sin subcomando se abre el modo interactivo con diálogos de archivo.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use generador_ts::configuracion::RUTA_POR_DEFECTO;
use generador_ts::{generar, guardar, Configuracion, Entradas, Extractor, Informe, Pie};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult};

#[derive(Parser)]
#[command(
    name = "generador-ts",
    version,
    about = "Genera informes Word a partir del encargo, el catastro y las fotos"
)]
struct Cli {
    /// Fichero de configuración
    #[arg(long, global = true, default_value = RUTA_POR_DEFECTO)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Genera un informe
    Generar {
        /// Texto del encargo (`-` para leerlo de la entrada estándar)
        #[arg(long)]
        encargo: PathBuf,
        /// Plantilla Word; por defecto la de la configuración
        #[arg(long)]
        plantilla: Option<PathBuf>,
        /// Usa la plantilla jurídica configurada
        #[arg(long)]
        juridico: bool,
        /// PDF de la Sede Electrónica del Catastro o imagen del plano
        #[arg(long)]
        catastro: Option<PathBuf>,
        /// Excel de modelos de póliza; por defecto el de la configuración
        #[arg(long)]
        polizas: Option<PathBuf>,
        /// Foto del reportaje, con pie opcional: `RUTA[=PIE]`
        #[arg(long = "foto", value_name = "RUTA[=PIE]", value_parser = parse_foto)]
        fotos: Vec<(PathBuf, Option<Pie>)>,
        /// Carpeta o fichero de salida
        #[arg(long, default_value = ".")]
        salida: PathBuf,
        /// Muestra los campos extraídos en JSON
        #[arg(long)]
        campos: bool,
    },
    /// Consulta o cambia la configuración
    Config {
        #[arg(long)]
        plantilla_base: Option<PathBuf>,
        #[arg(long)]
        plantilla_juridica: Option<PathBuf>,
        #[arg(long)]
        polizas: Option<PathBuf>,
        /// Muestra la configuración aunque no cambie
        #[arg(long)]
        mostrar: bool,
    },
    /// Elige los ficheros con diálogos
    Interactivo,
}

fn parse_foto(valor: &str) -> Result<(PathBuf, Option<Pie>), String> {
    match valor.rsplit_once('=') {
        Some((ruta, pie)) if !ruta.is_empty() => Ok((PathBuf::from(ruta), Some(pie.parse()?))),
        _ => Ok((PathBuf::from(valor), None)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    match ejecutar(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn ejecutar(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Configuracion::cargar(&cli.config)?;

    match cli.command {
        Some(Commands::Generar {
            encargo,
            plantilla,
            juridico,
            catastro,
            polizas,
            fotos,
            salida,
            campos,
        }) => {
            let entradas = Entradas {
                plantilla,
                juridico,
                encargo: Some(leer_encargo(&encargo)?),
                catastro,
                polizas,
                fotos,
            };
            let informe = generar(&entradas.cargar(&config)?, &Extractor::nuevo()?)?;
            if campos {
                println!("{}", serde_json::to_string_pretty(&informe.campos)?);
            }
            let ruta = guardar(&informe, &salida)?;
            resumen(&informe, &ruta);
        }
        Some(Commands::Config {
            plantilla_base,
            plantilla_juridica,
            polizas,
            mostrar,
        }) => {
            let cambia =
                plantilla_base.is_some() || plantilla_juridica.is_some() || polizas.is_some();
            if plantilla_base.is_some() {
                config.plantilla_base = plantilla_base;
            }
            if plantilla_juridica.is_some() {
                config.plantilla_juridica = plantilla_juridica;
            }
            if polizas.is_some() {
                config.hoja_polizas = polizas;
            }
            if cambia {
                config.guardar(&cli.config)?;
            }
            if cambia || mostrar {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        Some(Commands::Interactivo) | None => interactivo(&mut config, &cli.config)?,
    }
    Ok(())
}

fn leer_encargo(ruta: &Path) -> std::io::Result<String> {
    if ruta == Path::new("-") {
        let mut texto = String::new();
        std::io::stdin().read_to_string(&mut texto)?;
        Ok(texto)
    } else {
        std::fs::read_to_string(ruta)
    }
}

fn resumen(informe: &Informe, ruta: &Path) {
    println!(
        "\n✓ Informe guardado: {} ({} campos rellenos, {} fotos)",
        ruta.display(),
        informe.campos.rellenos(),
        informe.reportaje.insertadas
    );
    if informe.reportaje.fallidas > 0 {
        println!(
            "  {} fotos no se pudieron insertar",
            informe.reportaje.fallidas
        );
    }
}

fn interactivo(
    config: &mut Configuracion,
    ruta_config: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Generador de informes");
    println!("=====================\n");

    let juridico = MessageDialog::new()
        .set_title("Tipo de encargo")
        .set_description("¿Es un encargo con defensa jurídica?")
        .set_buttons(MessageButtons::YesNo)
        .show()
        == MessageDialogResult::Yes;

    let plantilla = match config.plantilla(juridico) {
        Some(ruta) => ruta.to_path_buf(),
        None => {
            println!("Seleccione la plantilla Word...");
            let Some(ruta) = FileDialog::new()
                .add_filter("Documentos Word", &["docx"])
                .set_title("Seleccionar plantilla")
                .pick_file()
            else {
                println!("No se seleccionó ninguna plantilla.");
                return Ok(());
            };
            if juridico {
                config.plantilla_juridica = Some(ruta.clone());
            } else {
                config.plantilla_base = Some(ruta.clone());
            }
            config.guardar(ruta_config)?;
            ruta
        }
    };
    println!("Plantilla: {}", plantilla.display());

    println!("Seleccione el texto del encargo...");
    let Some(encargo) = FileDialog::new()
        .add_filter("Texto", &["txt"])
        .set_title("Seleccionar encargo")
        .pick_file()
    else {
        println!("No se seleccionó ningún encargo.");
        return Ok(());
    };

    println!("Seleccione el catastro (opcional)...");
    let catastro = FileDialog::new()
        .add_filter("Catastro", &["pdf", "png", "jpg", "jpeg"])
        .set_title("Seleccionar catastro")
        .pick_file();

    println!("Seleccione las fotos (opcional)...");
    let fotos = FileDialog::new()
        .add_filter("Imágenes", &["png", "jpg", "jpeg"])
        .set_title("Seleccionar fotos")
        .pick_files()
        .unwrap_or_default();
    println!("{} fotos seleccionadas", fotos.len());

    let entradas = Entradas {
        plantilla: Some(plantilla),
        juridico,
        encargo: Some(std::fs::read_to_string(&encargo)?),
        catastro,
        polizas: None,
        fotos: fotos.into_iter().map(|f| (f, None)).collect(),
    };
    let informe = generar(&entradas.cargar(config)?, &Extractor::nuevo()?)?;

    println!("\nSeleccione dónde guardar el informe...");
    let Some(destino) = FileDialog::new()
        .add_filter("Documentos Word", &["docx"])
        .set_title("Guardar informe")
        .set_file_name(&informe.nombre)
        .save_file()
    else {
        println!("No se guardó el informe.");
        return Ok(());
    };
    let ruta = guardar(&informe, &destino)?;
    resumen(&informe, &ruta);
    Ok(())
}
