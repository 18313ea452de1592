//! Per-connection request handling
//!
//! A connection carries exactly one request. Unary requests get one reply
//! line and the connection closes; stream requests keep it open until the
//! client goes away, a write fails, or the subscriber is dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::chat::InboundChat;
use crate::error::Result;
use crate::server::codec::{CodecError, LineReader, LineWriter};
use crate::server::config::ServerConfig;
use crate::server::protocol::{Reply, ReplyBody, Request, StreamItem};
use crate::service::{CatService, ChatSession, FeedStream, ServiceError};

/// One client connection
pub struct Connection<R, W> {
    id: u64,
    peer_addr: SocketAddr,
    reader: LineReader<R>,
    writer: LineWriter<W>,
    service: Arc<CatService>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a split socket; nothing is read until [`run`](Self::run)
    pub fn new(
        id: u64,
        peer_addr: SocketAddr,
        reader: R,
        writer: W,
        config: &ServerConfig,
        service: Arc<CatService>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            reader: LineReader::new(reader, config.max_line_length),
            writer: LineWriter::new(writer, config.write_timeout),
            service,
        }
    }

    /// Read the request and serve it to completion
    pub async fn run(&mut self) -> Result<()> {
        let line = match self.reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(CodecError::LineTooLong(max)) => {
                let error = ServiceError::InvalidArgument(format!("request exceeds {} bytes", max));
                return self.reply(Reply::from(&error)).await;
            }
            Err(e) => return Err(e.into()),
        };

        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(e) => return self.reply(Reply::from(&e)).await,
        };

        tracing::debug!(
            connection_id = self.id,
            peer = %self.peer_addr,
            method = request.method(),
            "Request"
        );

        match request {
            Request::ListCats => {
                let list = self.service.list_cats().await;
                let cats = list.cats.iter().map(|cat| cat.as_ref()).collect();
                self.reply(Reply::ok(ReplyBody::Cats {
                    cats,
                    total: list.total,
                }))
                .await
            }
            Request::GetCat { id } => match self.service.get_cat(&id).await {
                Ok(cat) => self.reply(Reply::ok(ReplyBody::Cat { cat: &cat })).await,
                Err(e) => self.reply(Reply::from(&e)).await,
            },
            Request::AddSource { name, url, kind } => {
                let ack = self.service.add_source(&name, &url, &kind);
                self.reply(Reply::ok(ReplyBody::SourceAdded {
                    ok: ack.ok,
                    message: &ack.message,
                }))
                .await
            }
            Request::StreamCatFeed => {
                let opened = self.service.stream_cat_feed().await;
                self.serve_feed(opened).await
            }
            Request::StreamCatsByBreed { breed } => {
                let opened = self.service.stream_cats_by_breed(&breed).await;
                self.serve_feed(opened).await
            }
            Request::StreamNewCats => {
                let opened = self.service.stream_new_cats().await;
                self.serve_feed(opened).await
            }
            Request::CatChat => {
                let session = self.service.cat_chat().await;
                self.serve_chat(session).await
            }
        }
    }

    async fn reply(&mut self, reply: Reply<'_>) -> Result<()> {
        self.writer.write_item(&reply).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn serve_feed(
        &mut self,
        opened: std::result::Result<FeedStream, ServiceError>,
    ) -> Result<()> {
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return self.reply(Reply::from(&e)).await,
        };

        tracing::info!(
            connection_id = self.id,
            subscriber = %stream.id(),
            class = %stream.class(),
            "Stream opened"
        );

        let result = self.pump_feed(&mut stream).await;
        stream.close().await;

        tracing::info!(connection_id = self.id, subscriber = %stream.id(), "Stream closed");
        result
    }

    /// Forward deliveries until the subscriber is dropped or a write fails
    ///
    /// Feeds take no input. A client that half-closes after its request
    /// still receives the whole stream; once it is really gone the next
    /// write fails or times out.
    async fn pump_feed(&mut self, stream: &mut FeedStream) -> Result<()> {
        let mut input_open = true;

        loop {
            tokio::select! {
                biased;

                delivery = stream.next() => {
                    let Some(delivery) = delivery else {
                        // Dropped by the broadcast engine
                        return Ok(());
                    };
                    self.writer.write_item(&StreamItem::from(&delivery)).await?;
                }
                line = self.reader.next_line(), if input_open => {
                    if line?.is_none() {
                        tracing::debug!(connection_id = self.id, "Client closed its write side");
                        input_open = false;
                    }
                }
            }
        }
    }

    async fn serve_chat(&mut self, mut session: ChatSession) -> Result<()> {
        tracing::info!(connection_id = self.id, participant = %session.id(), "Chat joined");

        let result = self.pump_chat(&mut session).await;
        session.leave().await;

        tracing::info!(connection_id = self.id, participant = %session.id(), "Chat left");
        result
    }

    async fn pump_chat(&mut self, session: &mut ChatSession) -> Result<()> {
        loop {
            tokio::select! {
                message = session.next() => {
                    let Some(message) = message else {
                        return Ok(());
                    };
                    self.writer.write_item(&StreamItem::Chat(&message)).await?;
                }
                line = self.reader.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }

                    match serde_json::from_slice::<InboundChat>(&line) {
                        Ok(inbound) => {
                            session.send(inbound).await;
                        }
                        Err(e) => {
                            tracing::debug!(
                                connection_id = self.id,
                                error = %e,
                                "Ignoring malformed chat message"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

    use super::*;
    use crate::broadcast::BroadcastEngine;
    use crate::catalog::{CatRecord, Catalog};
    use crate::chat::ChatRelay;
    use crate::registry::SubscriptionRegistry;

    fn service() -> Arc<CatService> {
        Arc::new(CatService::new(
            Arc::new(Catalog::new()),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(ChatRelay::new()),
        ))
    }

    struct Client {
        lines: Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
        writer: tokio::io::WriteHalf<DuplexStream>,
        task: tokio::task::JoinHandle<Result<()>>,
    }

    impl Client {
        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }

        /// Half-close: no more input, still reading
        async fn hang_up(&mut self) {
            self.writer.shutdown().await.unwrap();
        }

        /// Drop both directions, as a client that went away
        fn disconnect(self) -> tokio::task::JoinHandle<Result<()>> {
            self.task
        }

        async fn recv(&mut self) -> Option<Value> {
            let line = self.lines.next_line().await.unwrap()?;
            Some(serde_json::from_str(&line).unwrap())
        }
    }

    fn connect(service: &Arc<CatService>) -> Client {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);

        let config = ServerConfig::default().write_timeout(Duration::from_secs(1));
        let mut connection = Connection::new(
            1,
            "127.0.0.1:1".parse().unwrap(),
            server_read,
            server_write,
            &config,
            Arc::clone(service),
        );

        Client {
            lines: BufReader::new(client_read).lines(),
            writer: client_write,
            task: tokio::spawn(async move { connection.run().await }),
        }
    }

    async fn admit(service: &CatService, breed: &str, url: &str) {
        let admission = service
            .catalog()
            .append(CatRecord::candidate("test", url, breed, ""))
            .await;
        let record = admission.record().unwrap().clone();
        BroadcastEngine::new(Arc::clone(service.registry()))
            .publish(&record)
            .await;
    }

    async fn wait_for_subscribers(service: &CatService, n: usize) {
        for _ in 0..200 {
            if service.registry().stats().await.total() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} subscribers", n);
    }

    #[tokio::test]
    async fn test_list_cats_then_close() {
        let service = service();
        admit(&service, "Tabby", "http://a/1").await;

        let mut client = connect(&service);
        client.send(r#"{"method":"ListCats"}"#).await;

        let reply = client.recv().await.unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["total"], 1);
        assert_eq!(reply["cats"][0]["breed"], "Tabby");

        assert!(client.recv().await.is_none());
        client.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_get_cat_not_found() {
        let service = service();
        let mut client = connect(&service);
        client.send(r#"{"method":"GetCat","id":"missing"}"#).await;

        let reply = client.recv().await.unwrap();
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["code"], "NOT_FOUND");
        assert_eq!(reply["message"], "Cat not found");
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let service = service();
        let mut client = connect(&service);
        client.send("hello").await;

        let reply = client.recv().await.unwrap();
        assert_eq!(reply["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_breed_stream_requires_breed() {
        let service = service();
        let mut client = connect(&service);
        client.send(r#"{"method":"StreamCatsByBreed","breed":""}"#).await;

        let reply = client.recv().await.unwrap();
        assert_eq!(reply["code"], "INVALID_ARGUMENT");
        assert_eq!(reply["message"], "breed parameter required");
        assert_eq!(service.registry().stats().await.total(), 0);
    }

    #[tokio::test]
    async fn test_feed_stream_until_client_leaves() {
        let service = service();
        admit(&service, "Siamese", "http://a/1").await;

        let mut client = connect(&service);
        client.send(r#"{"method":"StreamCatFeed"}"#).await;

        assert_eq!(client.recv().await.unwrap()["breed"], "Siamese");
        wait_for_subscribers(&service, 1).await;

        admit(&service, "Persian", "http://a/2").await;
        assert_eq!(client.recv().await.unwrap()["breed"], "Persian");

        // The next write finds the peer gone
        let task = client.disconnect();
        admit(&service, "Bengal", "http://a/3").await;

        assert!(task.await.unwrap().is_err());
        assert_eq!(service.registry().stats().await.total(), 0);
    }

    #[tokio::test]
    async fn test_feed_survives_half_close() {
        let service = service();
        for i in 0..200 {
            admit(&service, "Tabby", &format!("http://a/{}", i)).await;
        }

        let mut client = connect(&service);
        client.send(r#"{"method":"StreamCatFeed"}"#).await;
        client.hang_up().await;

        for i in 0..200 {
            let cat = client.recv().await.unwrap();
            assert_eq!(cat["url"], format!("http://a/{}", i));
        }

        wait_for_subscribers(&service, 1).await;
        admit(&service, "Siamese", "http://a/live").await;
        assert_eq!(client.recv().await.unwrap()["breed"], "Siamese");
        assert!(!client.task.is_finished());
    }

    #[tokio::test]
    async fn test_new_cats_stream_sends_added_events() {
        let service = service();
        let mut client = connect(&service);
        client.send(r#"{"method":"StreamNewCats"}"#).await;
        wait_for_subscribers(&service, 1).await;

        admit(&service, "Bengal", "http://a/1").await;

        let event = client.recv().await.unwrap();
        assert_eq!(event["event"], "added");
        assert_eq!(event["cat"]["breed"], "Bengal");
    }

    #[tokio::test]
    async fn test_chat_relays_between_connections() {
        let service = service();
        let mut alice = connect(&service);
        let mut bob = connect(&service);
        alice.send(r#"{"method":"CatChat"}"#).await;
        bob.send(r#"{"method":"CatChat"}"#).await;

        for _ in 0..200 {
            if service.chat().participant_count().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        alice.send("").await;
        alice.send("{broken").await;
        alice.send(r#"{"from":"alice","text":"meow"}"#).await;

        let message = bob.recv().await.unwrap();
        assert_eq!(message["from"], "alice");
        assert_eq!(message["text"], "meow");
        assert!(message["ts"].is_i64());
        assert_eq!(alice.recv().await.unwrap()["text"], "meow");

        bob.hang_up().await;
        bob.task.await.unwrap().unwrap();
        assert_eq!(service.chat().participant_count().await, 1);
    }
}
