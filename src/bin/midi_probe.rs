use anyhow::Result;

use kinetone::audio::list_output_ports;

/// 利用可能なMIDI出力ポートを列挙する診断ツール
fn main() -> Result<()> {
    println!("kinetone midi_probe {}", env!("GIT_VERSION"));
    println!();

    let ports = list_output_ports()?;
    if ports.is_empty() {
        println!("No MIDI output ports found.");
        println!("Start a softsynth (e.g. fluidsynth) and run again.");
        return Ok(());
    }

    println!("Available MIDI output ports:");
    for (i, name) in ports.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }
    println!();
    println!("Set [music] midi_port in kinetone.toml to a substring of a port name.");
    Ok(())
}
