use std::str::FromStr;

/// Helper struct to parse drive configurations.
pub enum DriveCfg {
    /// `emu:model=<m>[,serial=<s>][,firmware=<f>][,name=<n>][,iface=<tok>][,passthru][,trust]`
    Emu {
        name: String,
        iface: String,
        model: String,
        serial: String,
        firmware: String,
        passthru: bool,
        trust: bool,
    },
    /// `null:name=<n>[,iface=<tok>]`
    Null { name: String, iface: String },
}

impl FromStr for DriveCfg {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<DriveCfg, &'static str> {
        let mut s = s.splitn(2, ':');
        let kind = s.next().unwrap();
        Ok(match kind {
            "emu" => {
                let s = s.next().ok_or("missing required options")?.split(',');

                let mut name = None;
                let mut iface = None;
                let mut model = None;
                let mut serial = None;
                let mut firmware = None;
                let mut passthru = false;
                let mut trust = false;

                for arg in s {
                    let mut s = arg.split('=');
                    let key = s.next().unwrap();
                    match key {
                        "name" => {
                            name = Some(s.next().ok_or("missing argument for `name`")?.to_string())
                        }
                        "iface" => {
                            iface =
                                Some(s.next().ok_or("missing argument for `iface`")?.to_string())
                        }
                        "model" => {
                            model =
                                Some(s.next().ok_or("missing argument for `model`")?.to_string())
                        }
                        "serial" => {
                            serial =
                                Some(s.next().ok_or("missing argument for `serial`")?.to_string())
                        }
                        "firmware" => {
                            firmware = Some(
                                s.next()
                                    .ok_or("missing argument for `firmware`")?
                                    .to_string(),
                            )
                        }
                        "passthru" => passthru = true,
                        "trust" => trust = true,
                        _ => return Err("unknown `emu` option"),
                    }
                }

                let model = model.ok_or("missing `model` parameter")?;
                DriveCfg::Emu {
                    name: name.unwrap_or_else(|| model.clone()),
                    iface: iface.unwrap_or_else(|| "IDE".to_string()),
                    model,
                    serial: serial.unwrap_or_default(),
                    firmware: firmware.unwrap_or_default(),
                    passthru,
                    trust,
                }
            }
            "null" => {
                let s = s.next().ok_or("missing required options")?.split(',');

                let mut name = None;
                let mut iface = None;

                for arg in s {
                    let mut s = arg.split('=');
                    let key = s.next().unwrap();
                    match key {
                        "name" => {
                            name = Some(s.next().ok_or("missing argument for `name`")?.to_string())
                        }
                        "iface" => {
                            iface =
                                Some(s.next().ok_or("missing argument for `iface`")?.to_string())
                        }
                        _ => return Err("unknown `null` option"),
                    }
                }

                DriveCfg::Null {
                    name: name.ok_or("missing `name` parameter")?,
                    iface: iface.unwrap_or_else(|| "IDE".to_string()),
                }
            }
            _ => return Err("invalid drive kind"),
        })
    }
}
