// src/io/osc/receiver.rs
//
// OSC control-message listener.
//
// Binds a UDP endpoint, announces the bridge to the upstream sender with a
// one-shot registration message, then forwards every numeric
// (address, value) pair into the scheduler's event channel. Address filtering
// is not done here: the dispatcher owns the lookup table and silently drops
// what it does not track, so this task stays a dumb pump.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;

use crate::io::{ControlEvent, EventSender, IoError};

/// How long a single receive waits before re-checking the cancel flag.
const RECV_POLL: Duration = Duration::from_millis(250);

/// Route the upstream sender listens on for listener registrations.
const REGISTRATION_ROUTE: &str = "/rnbo/listeners/add";

#[derive(Clone, Debug)]
pub struct OscReceiverConfig {
    /// Port this bridge receives control messages on.
    pub listen_port: u16,
    /// Port of the upstream sender's own control endpoint, used only for the
    /// startup registration message.
    pub send_port: u16,
}

/// Bind the listening socket. A failure here is a setup error: the process
/// cannot do its job without the inbound channel.
pub async fn bind_listener(listen_port: u16) -> Result<UdpSocket, IoError> {
    UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, listen_port))
        .await
        .map_err(|e| IoError::setup(format!("OSC listener bind on port {}: {}", listen_port, e)))
}

/// Pump inbound OSC packets into the event channel until cancelled.
pub async fn run_receiver(
    socket: UdpSocket,
    config: OscReceiverConfig,
    tx: EventSender,
    cancel: Arc<AtomicBool>,
) {
    announce(&socket, &config).await;

    let mut buf = vec![0u8; decoder::MTU];
    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        match tokio::time::timeout(RECV_POLL, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _peer))) => match decoder::decode_udp(&buf[..len]) {
                Ok((_, packet)) => forward_packet(packet, &tx),
                Err(e) => tlog!("[osc] undecodable packet ({} bytes): {:?}", len, e),
            },
            Ok(Err(e)) => {
                tlog!("[osc] receive error: {}", e);
                tokio::time::sleep(RECV_POLL).await;
            }
            // Timeout: no traffic, loop to re-check the cancel flag.
            Err(_) => {}
        }
    }
    tlog!("[osc] listener stopped");
}

/// One-shot registration so the sender knows where to direct events.
/// Best effort: a failure is logged, and the listener still runs (the sender
/// may also be configured with a static target).
async fn announce(socket: &UdpSocket, config: &OscReceiverConfig) {
    let msg = OscPacket::Message(OscMessage {
        addr: REGISTRATION_ROUTE.to_string(),
        args: vec![OscType::String(format!("127.0.0.1:{}", config.listen_port))],
    });
    let bytes = match encoder::encode(&msg) {
        Ok(b) => b,
        Err(e) => {
            tlog!("[osc] registration encode failed (continuing): {:?}", e);
            return;
        }
    };
    let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, config.send_port);
    match socket.send_to(&bytes, target).await {
        Ok(_) => tlog!("[osc] registered with sender at {}", target),
        Err(e) => tlog!("[osc] registration send failed (continuing): {}", e),
    }
}

/// Flatten bundles and forward every message with a numeric first argument.
fn forward_packet(packet: OscPacket, tx: &EventSender) {
    match packet {
        OscPacket::Message(msg) => {
            if let Some(value) = first_numeric_arg(&msg) {
                // Send failure means the scheduler is gone; nothing to do.
                let _ = tx.send(ControlEvent {
                    address: msg.addr,
                    value,
                });
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                forward_packet(inner, tx);
            }
        }
    }
}

/// First argument as an integer. Floats truncate toward zero; non-numeric
/// arguments mean the message is not a parameter update and is ignored.
fn first_numeric_arg(msg: &OscMessage) -> Option<i32> {
    match msg.args.first()? {
        OscType::Int(i) => Some(*i),
        OscType::Long(l) => Some((*l).clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        OscType::Float(f) => Some(*f as i32),
        OscType::Double(d) => Some(*d as i32),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscTime};
    use std::sync::mpsc;

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn test_forward_int_message() {
        let (tx, rx) = mpsc::channel();
        forward_packet(
            OscPacket::Message(message("/out/brightness", vec![OscType::Int(200)])),
            &tx,
        );
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.address, "/out/brightness");
        assert_eq!(ev.value, 200);
    }

    #[test]
    fn test_forward_float_truncates() {
        let (tx, rx) = mpsc::channel();
        forward_packet(
            OscPacket::Message(message("/out/radius", vec![OscType::Float(99.9)])),
            &tx,
        );
        assert_eq!(rx.try_recv().unwrap().value, 99);
    }

    #[test]
    fn test_non_numeric_messages_are_ignored() {
        let (tx, rx) = mpsc::channel();
        forward_packet(
            OscPacket::Message(message("/out/label", vec![OscType::String("hi".into())])),
            &tx,
        );
        forward_packet(OscPacket::Message(message("/out/empty", vec![])), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_bundles_are_flattened_in_order() {
        let (tx, rx) = mpsc::channel();
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 0)),
            content: vec![
                OscPacket::Message(message("/a", vec![OscType::Int(1)])),
                OscPacket::Message(message("/b", vec![OscType::Int(2)])),
            ],
        });
        forward_packet(bundle, &tx);
        assert_eq!(rx.try_recv().unwrap().address, "/a");
        assert_eq!(rx.try_recv().unwrap().address, "/b");
    }

    #[test]
    fn test_decode_forward_roundtrip() {
        let (tx, rx) = mpsc::channel();
        let wire = encoder::encode(&OscPacket::Message(message(
            "/rnbo/inst/1/messages/out/pattern",
            vec![OscType::Int(7)],
        )))
        .unwrap();
        let (_, packet) = decoder::decode_udp(&wire).unwrap();
        forward_packet(packet, &tx);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.address, "/rnbo/inst/1/messages/out/pattern");
        assert_eq!(ev.value, 7);
    }
}
