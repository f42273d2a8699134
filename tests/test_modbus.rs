mod common;
use common::*;

use bytes::{Buf, BufMut, BytesMut};
use solaredge_bridge::error::ConnectionError;
use solaredge_bridge::modbus::{ModbusClient, RegisterFetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn read_request(stream: &mut tokio::net::TcpStream) -> (u16, u8, u16, u16) {
    let mut request = [0u8; 12];
    stream.read_exact(&mut request).await.unwrap();

    let mut request = &request[..];
    let transaction_id = request.get_u16();
    assert_eq!(request.get_u16(), 0); // protocol identifier
    assert_eq!(request.get_u16(), 6); // remaining length
    let unit_id = request.get_u8();
    assert_eq!(request.get_u8(), 0x03); // read holding registers
    let start = request.get_u16();
    let count = request.get_u16();

    (transaction_id, unit_id, start, count)
}

#[tokio::test]
async fn fetch_returns_register_block() {
    common_setup();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (transaction_id, unit_id, start, count) = read_request(&mut stream).await;
        assert_eq!(unit_id, 1);
        assert_eq!(start, 40069);
        assert_eq!(count, 38);

        let mut reply = BytesMut::new();
        reply.put_u16(transaction_id);
        reply.put_u16(0);
        reply.put_u16(3 + count * 2);
        reply.put_u8(unit_id);
        reply.put_u8(0x03);
        reply.put_u8((count * 2) as u8);
        for i in 0..count {
            reply.put_u16(i);
        }
        stream.write_all(&reply).await.unwrap();
    });

    let mut client = ModbusClient::new("127.0.0.1".to_string(), port, 1, 5);
    let block = client.fetch(40069, 38).await.unwrap();

    assert_eq!(block.len(), 38);
    let bytes = block.as_bytes();
    // register 5 holds 5, big-endian
    assert_eq!(&bytes[10..12], &[0x00, 0x05]);

    server.await.unwrap();
}

#[tokio::test]
async fn exception_response_is_typed() {
    common_setup();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (transaction_id, unit_id, _, _) = read_request(&mut stream).await;

        let mut reply = BytesMut::new();
        reply.put_u16(transaction_id);
        reply.put_u16(0);
        reply.put_u16(3);
        reply.put_u8(unit_id);
        reply.put_u8(0x83); // exception for function 0x03
        reply.put_u8(0x02); // illegal data address
        stream.write_all(&reply).await.unwrap();
    });

    let mut client = ModbusClient::new("127.0.0.1".to_string(), port, 1, 5);
    match client.fetch(40069, 38).await {
        Err(ConnectionError::Exception(code)) => assert_eq!(code, 0x02),
        other => panic!("expected exception response, got {:?}", other.map(|_| ())),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn short_register_payload_is_rejected() {
    common_setup();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (transaction_id, unit_id, _, _) = read_request(&mut stream).await;

        // one register instead of the requested 38
        let mut reply = BytesMut::new();
        reply.put_u16(transaction_id);
        reply.put_u16(0);
        reply.put_u16(5);
        reply.put_u8(unit_id);
        reply.put_u8(0x03);
        reply.put_u8(2);
        reply.put_u16(1234);
        stream.write_all(&reply).await.unwrap();
    });

    let mut client = ModbusClient::new("127.0.0.1".to_string(), port, 1, 5);
    match client.fetch(40069, 38).await {
        Err(ConnectionError::UnexpectedReply(_)) => {}
        other => panic!("expected unexpected-reply error, got {:?}", other.map(|_| ())),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_typed() {
    common_setup();

    // bind then drop to find a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = ModbusClient::new("127.0.0.1".to_string(), port, 1, 1);
    match client.fetch(40069, 38).await {
        Err(ConnectionError::Refused { .. }) => {}
        other => panic!("expected refused error, got {:?}", other.map(|_| ())),
    }
}
