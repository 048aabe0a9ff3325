#![cfg(target_os = "linux")]

mod common;

use bytes::Bytes;
use common::Recorder;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tidewire::codec::{Endianness, LengthPrefixedReader, LengthPrefixedWriter};
use tidewire::{Channel, Interest, Responder, Selector, TcpChannel};

/// Runs the selector until `done` holds, failing after ten seconds.
fn drive<C: Channel>(selector: &mut Selector, responder: &Responder<C>, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut ready = Vec::new();

    while !done() {
        assert!(Instant::now() < deadline, "timed out driving the selector");

        selector
            .select(&mut ready, Some(Duration::from_millis(50)))
            .expect("select failed");

        for readiness in &ready {
            responder.dispatch(*readiness);
        }
    }
}

#[test]
fn test_framed_exchange_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept connection");

        let mut buffer = [0u8; 18];
        stream
            .read_exact(&mut buffer)
            .expect("Failed to read from stream");
        assert_eq!(&buffer, b"\x00\x04ping\x00\x04ping\x00\x04ping");

        stream
            .write_all(b"\x00\x04pong")
            .expect("Failed to write to stream");
    });

    let channel = TcpChannel::connect(addr).expect("Failed to start connect");
    let mut selector = Selector::new().expect("Failed to create selector");
    let key = selector
        .register(channel.as_raw_fd(), 7, Interest::NONE)
        .expect("Failed to register channel");

    let recorder = Arc::new(Recorder::default());
    let responder = Responder::builder(channel)
        .packet_writer(LengthPrefixedWriter::new(2, Endianness::Big))
        .packet_reader(LengthPrefixedReader::new(2, Endianness::Big))
        .observer(recorder.clone())
        .build();
    responder.set_registration(key);

    for _ in 0..3 {
        assert!(responder.write(&b"ping"[..]));
    }

    drive(&mut selector, &responder, || {
        recorder.events().last().map(String::as_str) == Some("broken:eof")
    });

    server.join().expect("Thread panicked");

    assert_eq!(responder.bytes_written(), 18);
    assert!(!responder.is_open());
    assert_eq!(
        *recorder.packets.lock().unwrap(),
        vec![Bytes::from_static(b"pong")]
    );
    assert_eq!(recorder.events(), vec!["opened", "packet", "broken:eof"]);
}

#[test]
fn test_bulk_transfer_respects_queue_bound() {
    const PACKET: usize = 16 * 1024;
    const PACKETS: usize = 64;
    const TOTAL: usize = PACKET * PACKETS;

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept connection");
        let mut received = Vec::new();
        stream
            .read_to_end(&mut received)
            .expect("Failed to read from stream");
        received
    });

    let channel = TcpChannel::connect(addr).expect("Failed to start connect");
    let mut selector = Selector::new().expect("Failed to create selector");
    let key = selector
        .register(channel.as_raw_fd(), 0, Interest::NONE)
        .expect("Failed to register channel");

    let responder = Responder::builder(channel)
        .max_queue_size(4 * PACKET)
        .build();
    responder.set_registration(key);

    let payload: Vec<Bytes> = (0..PACKETS)
        .map(|i| Bytes::from(vec![i as u8; PACKET]))
        .collect();
    let mut next = 0;

    drive(&mut selector, &responder, || {
        while next < PACKETS && responder.write(payload[next].clone()) {
            next += 1;
        }
        assert!(responder.write_queue_size() <= 4 * PACKET);

        responder.bytes_written() == TOTAL as u64
    });

    responder.close();

    let received = server.join().expect("Thread panicked");
    assert_eq!(received.len(), TOTAL);
    for (i, chunk) in received.chunks(PACKET).enumerate() {
        assert!(chunk.iter().all(|b| *b == i as u8), "packet {i} corrupted");
    }
}

#[test]
fn test_refused_connect_tears_down() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        listener.local_addr().expect("Failed to get local address")
    };

    let channel = match TcpChannel::connect(addr) {
        Ok(channel) => channel,
        Err(err) => {
            assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
            return;
        }
    };

    let mut selector = Selector::new().expect("Failed to create selector");
    let key = selector
        .register(channel.as_raw_fd(), 0, Interest::NONE)
        .expect("Failed to register channel");

    let recorder = Arc::new(Recorder::default());
    let responder = Responder::builder(channel)
        .observer(recorder.clone())
        .build();
    responder.set_registration(key);
    responder.write(&b"never sent"[..]);

    drive(&mut selector, &responder, || !responder.is_open());

    assert_eq!(responder.bytes_written(), 0);
    assert_eq!(recorder.events(), vec!["broken:io"]);
}

#[test]
fn test_accepted_stream_reports_addresses_and_sends() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let mut client = std::net::TcpStream::connect(addr).expect("Failed to connect");
    let (accepted, _) = listener.accept().expect("Failed to accept connection");

    let channel = TcpChannel::from_std(accepted).expect("Failed to wrap stream");
    assert!(channel.is_connected());
    assert_eq!(channel.local_addr().expect("Failed to get local address"), addr);
    assert_eq!(
        channel.peer_addr().expect("Failed to get peer address"),
        client.local_addr().expect("Failed to get client address")
    );

    let mut selector = Selector::new().expect("Failed to create selector");
    let key = selector
        .register(channel.as_raw_fd(), 3, Interest::NONE)
        .expect("Failed to register channel");

    let responder = Responder::new(channel);
    responder.set_registration(key);
    assert!(responder.write(&b"welcome"[..]));

    drive(&mut selector, &responder, || responder.bytes_written() == 7);

    let mut buffer = [0u8; 7];
    client
        .read_exact(&mut buffer)
        .expect("Failed to read from stream");
    assert_eq!(&buffer, b"welcome");
}
