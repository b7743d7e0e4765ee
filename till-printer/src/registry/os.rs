//! OS-managed printer queues
//!
//! Windows is asked through PowerShell `Get-Printer`, other platforms through
//! CUPS `lpstat -v`. The shell call carries its own timeout and every failure
//! collapses to an empty list.

use super::DiscoveryPass;
use crate::device::PrinterDescriptor;
use crate::error::{PrintError, PrintResult};
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// One queue as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsPrinter {
    pub name: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub port_name: Option<String>,
}

/// OS printer queues of this pass as descriptors; never fails
pub async fn detect_windows_printers(pass: &DiscoveryPass) -> Vec<PrinterDescriptor> {
    pass.os_printers()
        .await
        .iter()
        .map(|p| PrinterDescriptor::os_queue(&p.name, p.driver_name.clone(), p.port_name.clone()))
        .collect()
}

/// Run the platform enumeration command
#[instrument]
pub async fn list_os_printers(shell_timeout: Duration) -> PrintResult<Vec<OsPrinter>> {
    let mut cmd = enumeration_command();
    cmd.kill_on_drop(true);

    let output = tokio::time::timeout(shell_timeout, cmd.output())
        .await
        .map_err(|_| PrintError::Timeout("printer enumeration".to_string()))??;

    if !output.status.success() {
        return Err(PrintError::Spooler(format!(
            "printer enumeration exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let printers = parse_output(&stdout)?;
    debug!(count = printers.len(), "OS printers enumerated");
    Ok(printers)
}

#[cfg(windows)]
fn enumeration_command() -> Command {
    let mut cmd = Command::new("powershell");
    cmd.args([
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-Printer | Select-Object Name,DriverName,PortName | ConvertTo-Json -Compress",
    ]);
    cmd
}

#[cfg(not(windows))]
fn enumeration_command() -> Command {
    let mut cmd = Command::new("lpstat");
    cmd.arg("-v");
    cmd
}

#[cfg(windows)]
fn parse_output(stdout: &str) -> PrintResult<Vec<OsPrinter>> {
    parse_get_printer_json(stdout)
}

#[cfg(not(windows))]
fn parse_output(stdout: &str) -> PrintResult<Vec<OsPrinter>> {
    Ok(parse_lpstat(stdout))
}

/// `ConvertTo-Json` emits an object for one printer and an array for more
pub fn parse_get_printer_json(stdout: &str) -> PrintResult<Vec<OsPrinter>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<OsPrinter>),
        One(OsPrinter),
    }

    let parsed: OneOrMany = serde_json::from_str(trimmed)
        .map_err(|e| PrintError::Spooler(format!("unexpected Get-Printer output: {}", e)))?;

    Ok(match parsed {
        OneOrMany::Many(list) => list,
        OneOrMany::One(p) => vec![p],
    })
}

/// Lines look like `device for NAME: URI`
pub fn parse_lpstat(stdout: &str) -> Vec<OsPrinter> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("device for ")?;
            let (name, uri) = rest.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(OsPrinter {
                name: name.to_string(),
                driver_name: None,
                port_name: Some(uri.trim().to_string()).filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_printer_array() {
        let out = r#"[{"Name":"POS-58","DriverName":"POS-58 Driver","PortName":"USB001"},
                      {"Name":"Microsoft Print to PDF","DriverName":"Microsoft Print To PDF","PortName":"PORTPROMPT:"}]"#;
        let printers = parse_get_printer_json(out).unwrap();
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].name, "POS-58");
        assert_eq!(printers[0].port_name.as_deref(), Some("USB001"));
    }

    #[test]
    fn test_parse_get_printer_single_object() {
        let out = r#"{"Name":"XP-80C","DriverName":null,"PortName":"USB002"}"#;
        let printers = parse_get_printer_json(out).unwrap();
        assert_eq!(printers.len(), 1);
        assert_eq!(printers[0].driver_name, None);
    }

    #[test]
    fn test_parse_get_printer_empty_and_garbage() {
        assert!(parse_get_printer_json("  \r\n").unwrap().is_empty());
        assert!(parse_get_printer_json("Get-Printer : not recognized").is_err());
    }

    #[test]
    fn test_parse_lpstat() {
        let out = "device for EPSON_TM_T20: usb://EPSON/TM-T20?serial=123\n\
                   device for Office: ipp://10.0.0.20/ipp/print\n\
                   lpstat: No destinations added.\n";
        let printers = parse_lpstat(out);
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].name, "EPSON_TM_T20");
        assert_eq!(
            printers[0].port_name.as_deref(),
            Some("usb://EPSON/TM-T20?serial=123")
        );
    }

    #[tokio::test]
    async fn test_detect_uses_pass_queues() {
        let pass = DiscoveryPass::with_os_printers(vec![OsPrinter {
            name: "Kitchen".to_string(),
            driver_name: Some("Generic / Text Only".to_string()),
            port_name: None,
        }]);
        let printers = detect_windows_printers(&pass).await;
        assert_eq!(printers.len(), 1);
        assert_eq!(printers[0].id, "windows-Kitchen");
    }

    #[tokio::test]
    async fn test_detect_never_fails() {
        // Whatever the host has installed, enumeration must resolve to a list
        let _ = detect_windows_printers(&DiscoveryPass::new(Duration::from_secs(5))).await;
    }
}
