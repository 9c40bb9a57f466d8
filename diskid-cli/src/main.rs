#[macro_use]
extern crate log;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error>>;

use structopt::StructOpt;

use diskid_core::drive::{DiskDrive, ScsiAddress};
use diskid_core::identify::IdentifyMeta;
use diskid_core::io::backend;

mod drivecfg;

use crate::drivecfg::DriveCfg;

#[derive(StructOpt)]
#[structopt(name = "diskid")]
#[structopt(about = r#"
Reads and displays the ATA Identify Sector of attached disk drives.
"#)]
struct Args {
    /// Drives to query.
    ///
    /// `emu:model=<m>[,serial=<s>][,firmware=<f>][,name=<n>][,iface=<IDE|USB|token>]
    /// [,passthru][,trust]` describes an emulated drive;
    /// `null:name=<n>[,iface=<token>]` a drive whose handle never opened.
    #[structopt(required = true)]
    drives: Vec<DriveCfg>,

    /// Per-command hardware timeout, in seconds.
    #[structopt(long, default_value = "15")]
    timeout: u32,
}

fn main() -> DynResult<()> {
    pretty_env_logger::formatted_builder()
        .filter(None, log::LevelFilter::Error)
        .filter(Some("diskid_core"), log::LevelFilter::Info)
        .filter(Some("diskid_cli"), log::LevelFilter::Info)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    let args = Args::from_args();

    println!("Enumerating disk drive devices...");

    for cfg in args.drives {
        let drive = build_drive(cfg).with_io_timeout(args.timeout);
        info!("querying {}", drive.name());

        // a failure on one drive must not abort the rest of the scan
        match drive.query_identify_sector() {
            Ok(()) => {
                println!();
                println!("{}", drive.name());
                println!("\tInterface= {}", drive.interface_kind());
                println!("\tModel= {}", drive.model());
                println!("\tVendor= {}", drive.vendor_id());
                println!("\tSerialNo= {}", drive.serial_no());
                println!("\tFirmware= {}", drive.firmware());
                println!(
                    "\tATA Passthru Capable= {}",
                    if drive.is_ata_passthru_capable() {
                        "Yes"
                    } else {
                        "No"
                    }
                );
            }
            Err(e) => eprintln!("Error : {}", e),
        }
    }

    Ok(())
}

fn build_drive(cfg: DriveCfg) -> DiskDrive {
    match cfg {
        DriveCfg::Emu {
            name,
            iface,
            model,
            serial,
            firmware,
            passthru,
            trust,
        } => {
            let sector = IdentifyMeta {
                serial: serial.as_bytes(),
                fw_version: firmware.as_bytes(),
                model: model.as_bytes(),
                ata_passthru: passthru,
                drive_trust: trust,
            }
            .to_identify_sector();

            DiskDrive::new(
                name,
                &iface,
                Box::new(backend::Emu::new(sector)),
                512,
                ScsiAddress::default(),
            )
        }
        DriveCfg::Null { name, iface } => DiskDrive::new(
            name,
            &iface,
            Box::new(backend::Null),
            512,
            ScsiAddress::default(),
        ),
    }
}
