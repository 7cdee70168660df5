use crate::cli::{OperatorCommand, CONSOLE_HELP};
use crate::error::Result;
use crate::peer::PeerHandle;
use std::io::{BufRead, Write};

/// Read operator commands line by line and run them against `peer` until
/// `quit` or end of input. Command failures are printed, not returned.
pub fn run_console<R: BufRead, W: Write>(peer: &PeerHandle, input: R, mut output: W) -> Result<()> {
    writeln!(output, "Type 'help' for commands")?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "Error: {e}")?;
                continue;
            }
        };
        if command == OperatorCommand::Quit {
            break;
        }
        if let Err(e) = execute(peer, command, &mut output) {
            writeln!(output, "Error: {e}")?;
        }
    }
    Ok(())
}

fn execute<W: Write>(peer: &PeerHandle, command: OperatorCommand, output: &mut W) -> Result<()> {
    match command {
        OperatorCommand::Mine => {
            let block = peer.mine()?;
            writeln!(
                output,
                "Mined block {} with proof {}",
                block.get_index(),
                block.get_proof()
            )?;
        }
        OperatorCommand::Tx(transaction) => {
            let index = peer.add_transaction(transaction)?;
            writeln!(output, "Transaction will be added to block {index}")?;
        }
        OperatorCommand::Chain => {
            for block in peer.chain()? {
                writeln!(
                    output,
                    "Block {}: proof {}, previous hash {}, timestamp {}",
                    block.get_index(),
                    block.get_proof(),
                    block.get_previous_hash(),
                    block.get_timestamp()
                )?;
                for tx in block.get_transactions() {
                    writeln!(
                        output,
                        "- {} -> {}: {}",
                        tx.get_sender(),
                        tx.get_recipient(),
                        tx.get_amount()
                    )?;
                }
            }
        }
        OperatorCommand::Neighbors => {
            let neighbors = peer.neighbors()?;
            if neighbors.is_empty() {
                writeln!(output, "No neighbors")?;
            }
            for neighbor in neighbors {
                writeln!(output, "{neighbor}")?;
            }
        }
        OperatorCommand::Status => {
            let status = peer.status()?;
            writeln!(
                output,
                "Id: {}",
                status.id.as_deref().unwrap_or("(waiting for relay)")
            )?;
            writeln!(output, "State: {:?}", status.state)?;
            writeln!(output, "Chain length: {}", status.chain_length)?;
            writeln!(output, "Pending transactions: {}", status.pending_transactions)?;
            writeln!(output, "Neighbors: {}", status.neighbors)?;
            writeln!(output, "Mining: {}", status.mining)?;
        }
        OperatorCommand::Help => writeln!(output, "{CONSOLE_HELP}")?,
        OperatorCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Envelope, Message};
    use crate::peer::Peer;
    use crate::testnet::{test_proof_of_work, RecordingSink};

    fn console_output(peer: &PeerHandle, script: &str) -> String {
        let mut output = Vec::new();
        run_console(peer, script.as_bytes(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_console_session() {
        let sink = RecordingSink::new();
        let peer = PeerHandle::spawn_peer(Peer::with_proof_of_work(sink, test_proof_of_work()));
        peer.deliver(Envelope::new("relay", "p1", Message::SetUuid("p1".to_string())))
            .unwrap();

        let output = console_output(&peer, "tx x y 5\n\nmine\nchain\nneighbors\nquit\nstatus\n");

        assert!(output.contains("Transaction will be added to block 2"));
        assert!(output.contains("Mined block 2"));
        assert!(output.contains("- x -> y: 5"));
        assert!(output.contains("- 0 -> p1: 1"));
        assert!(output.contains("No neighbors"));
        // Nothing after quit runs
        assert!(!output.contains("Chain length"));
    }

    #[test]
    fn test_console_reports_errors_and_continues() {
        let peer = PeerHandle::spawn_peer(Peer::with_proof_of_work(
            RecordingSink::new(),
            test_proof_of_work(),
        ));
        let output = console_output(&peer, "fly\nmine\nstatus\n");

        assert!(output.contains("Error: Malformed input: Unknown command: fly"));
        assert!(output.contains("Error: Peer has not been assigned an identifier"));
        assert!(output.contains("State: Unidentified"));
    }
}
