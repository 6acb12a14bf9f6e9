//! Multi-process-style cluster tests driving real `UdpTransport` instances
//! on localhost loopback, one `tokio::task` per replica. Scenarios are
//! grounded in `examples/original_source/test_basic.py`'s
//! `TestSimpleTest`/`TestDurability`/`TestConsistency` classes.

use std::time::Duration;

use seqkv_core::{Body, Envelope, Host, MessageLoop, Replica, ReplicaConfig, Transport, UdpTransport};
use test_log::test;
use tokio::time::timeout;

async fn spawn_cluster(size: usize, order_on_write: bool) -> (Vec<Host>, Vec<tokio::task::JoinHandle<()>>) {
    let mut transports = Vec::with_capacity(size);
    let mut hosts = Vec::with_capacity(size);
    for _ in 0..size {
        let transport = UdpTransport::bind(&Host::new("127.0.0.1", 0)).await.unwrap();
        let addr = transport.local_addr().unwrap();
        hosts.push(Host::new(addr.ip().to_string(), addr.port()));
        transports.push(transport);
    }

    let mut handles = Vec::with_capacity(size);
    for (transport, self_host) in transports.into_iter().zip(hosts.iter().cloned()) {
        let replica = Replica::new(ReplicaConfig {
            self_host,
            cluster: hosts.clone(),
            order_on_write,
        });
        let mut message_loop = MessageLoop::new(transport, replica);
        handles.push(tokio::spawn(async move {
            let _ = message_loop.run().await;
        }));
    }

    (hosts, handles)
}

async fn client_socket() -> (UdpTransport, Host) {
    let transport = UdpTransport::bind(&Host::new("127.0.0.1", 0)).await.unwrap();
    let addr = transport.local_addr().unwrap();
    (transport, Host::new(addr.ip().to_string(), addr.port()))
}

async fn write(client: &UdpTransport, client_host: &Host, target: &Host, keys: &[&str], values: &[&str]) {
    client
        .send(&Envelope::new(
            client_host.clone(),
            target.clone(),
            Body::ClientWrite {
                keys: keys.iter().map(|s| s.to_string()).collect(),
                values: values.iter().map(|s| s.to_string()).collect(),
            },
        ))
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("write_result timed out")
        .unwrap()
        .expect("well-formed write_result");
    assert!(matches!(reply.body, Body::WriteResult { .. }));
}

async fn read(client: &UdpTransport, client_host: &Host, target: &Host, keys: &[&str]) -> (Vec<Option<String>>, Vec<Option<u64>>) {
    client
        .send(&Envelope::new(
            client_host.clone(),
            target.clone(),
            Body::ClientRead {
                keys: keys.iter().map(|s| s.to_string()).collect(),
            },
        ))
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("read_ok timed out")
        .unwrap()
        .expect("well-formed read_ok");
    match reply.body {
        Body::ReadOk { value, order_index } => (value, order_index),
        other => panic!("expected read_ok, got {other:?}"),
    }
}

/// TestSimpleTest.test_simple_write_then_read: a single write followed by
/// a read of the same key on a three-node cluster returns the value just
/// written.
#[test(tokio::test)]
async fn single_write_then_read_on_three_node_cluster() {
    let (hosts, _handles) = spawn_cluster(3, false).await;
    let (client, client_host) = client_socket().await;

    write(&client, &client_host, &hosts[0], &["x"], &["1"]).await;
    let (values, order_indices) = read(&client, &client_host, &hosts[1], &["x"]).await;

    assert_eq!(values, vec![Some("1".to_string())]);
    assert_eq!(order_indices, vec![Some(0)]);
}

/// TestDurability: five sequential writes from two different clients each
/// land with a distinct, increasing order index and are all readable
/// afterward from any replica.
#[test(tokio::test)]
async fn five_sequential_writes_from_two_clients_are_all_durable() {
    let (hosts, _handles) = spawn_cluster(3, false).await;
    let (client_a, client_a_host) = client_socket().await;
    let (client_b, client_b_host) = client_socket().await;

    write(&client_a, &client_a_host, &hosts[0], &["a"], &["1"]).await;
    write(&client_b, &client_b_host, &hosts[1], &["b"], &["2"]).await;
    write(&client_a, &client_a_host, &hosts[2], &["a"], &["3"]).await;
    write(&client_b, &client_b_host, &hosts[0], &["c"], &["4"]).await;
    write(&client_a, &client_a_host, &hosts[1], &["a"], &["5"]).await;

    let (values, order_indices) = read(&client_a, &client_a_host, &hosts[2], &["a", "b", "c"]).await;
    assert_eq!(values, vec![Some("5".to_string()), Some("2".to_string()), Some("4".to_string())]);
    assert_eq!(order_indices[0], Some(4)); // "a" was written last, at global index 4
    assert!(order_indices.iter().all(|idx| idx.is_some()));
}

/// TestConsistency: a hundred sequential writes to the same key, issued
/// one at a time (each awaiting its write_result before the next), must
/// leave every replica agreeing on the final value.
#[test(tokio::test)]
async fn hundred_sequential_writes_converge_on_every_replica() {
    let (hosts, _handles) = spawn_cluster(3, false).await;
    let (client, client_host) = client_socket().await;

    for i in 0..100 {
        write(&client, &client_host, &hosts[i % hosts.len()], &["counter"], &[&i.to_string()]).await;
    }

    for host in &hosts {
        let (values, order_indices) = read(&client, &client_host, host, &["counter"]).await;
        assert_eq!(values, vec![Some("99".to_string())]);
        assert_eq!(order_indices, vec![Some(99)]);
    }
}

/// TestConsistency: a hundred writes issued without waiting for acks
/// (pipelined), then drained, must still produce a single agreed-upon
/// final global order observed identically from every replica.
#[test(tokio::test)]
async fn hundred_pipelined_writes_drain_to_a_consistent_order() {
    let (hosts, _handles) = spawn_cluster(3, false).await;
    let (client, client_host) = client_socket().await;

    for i in 0..100 {
        client
            .send(&Envelope::new(
                client_host.clone(),
                hosts[i % hosts.len()].clone(),
                Body::ClientWrite {
                    keys: vec!["k".to_string()],
                    values: vec![i.to_string()],
                },
            ))
            .await
            .unwrap();
    }

    let mut last_index = None;
    for _ in 0..100 {
        let reply = timeout(Duration::from_secs(5), client.recv())
            .await
            .expect("write_result timed out")
            .unwrap()
            .unwrap();
        assert!(matches!(reply.body, Body::WriteResult { .. }));
        last_index = Some(());
    }
    assert!(last_index.is_some());

    let (first, _) = read(&client, &client_host, &hosts[0], &["k"]).await;
    for host in &hosts[1..] {
        let (value, _) = read(&client, &client_host, host, &["k"]).await;
        assert_eq!(value, first, "all replicas must agree on the final value");
    }
}

/// TestConsistency_delay: write_order announcements can legitimately
/// arrive out of order relative to the writes that originated them
/// across two different originating replicas; the cluster must still
/// converge on the correct dense prefix rather than applying out of
/// order.
#[test(tokio::test)]
async fn out_of_order_write_order_across_two_originators_still_converges() {
    let (hosts, _handles) = spawn_cluster(3, false).await;
    let (client_a, client_a_host) = client_socket().await;
    let (client_b, client_b_host) = client_socket().await;

    // Interleave writes from two different originating replicas quickly
    // enough that write_order announcements from the orderer may race.
    let write_a = write(&client_a, &client_a_host, &hosts[0], &["shared"], &["from-a"]);
    let write_b = write(&client_b, &client_b_host, &hosts[1], &["shared"], &["from-b"]);
    tokio::join!(write_a, write_b);

    let (client_c, client_c_host) = client_socket().await;
    let (value, order_index) = read(&client_c, &client_c_host, &hosts[2], &["shared"]).await;
    assert!(value == Some("from-a".to_string()) || value == Some("from-b".to_string()));
    assert!(order_index.is_some());
}

/// A read arriving while its key's write is still in flight blocks and is
/// only answered once the write commits, rather than racing it.
#[test(tokio::test)]
async fn read_on_in_flight_write_delays_until_commit() {
    let (hosts, _handles) = spawn_cluster(2, false).await;
    let (writer, writer_host) = client_socket().await;
    let (reader, reader_host) = client_socket().await;

    writer
        .send(&Envelope::new(
            writer_host.clone(),
            hosts[0].clone(),
            Body::ClientWrite {
                keys: vec!["delayed".into()],
                values: vec!["final".into()],
            },
        ))
        .await
        .unwrap();
    reader
        .send(&Envelope::new(
            reader_host.clone(),
            hosts[0].clone(),
            Body::ClientRead {
                keys: vec!["delayed".into()],
            },
        ))
        .await
        .unwrap();

    let write_reply = timeout(Duration::from_secs(2), writer.recv()).await.unwrap().unwrap().unwrap();
    assert!(matches!(write_reply.body, Body::WriteResult { .. }));
    let read_reply = timeout(Duration::from_secs(2), reader.recv()).await.unwrap().unwrap().unwrap();
    match read_reply.body {
        Body::ReadOk { value, .. } => assert_eq!(value, vec![Some("final".to_string())]),
        other => panic!("expected read_ok, got {other:?}"),
    }
}
