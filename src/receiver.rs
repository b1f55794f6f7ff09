use std::net::SocketAddr;
use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::time::sleep;

use crate::config::Config;
use crate::consumer::{Consumer, Datagram, Outcome};

/// Owns the bound socket and hands each datagram to a single consumer.
pub struct Receiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl Receiver {
    pub async fn bind(config: &Config) -> Result<Self> {
        let addr = config.listen_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind UDP socket on {}", addr))?;
        Ok(Self {
            socket,
            buf: vec![0u8; config.buffer_size],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for one datagram and consume it, including the redraw pause.
    pub async fn receive_one<C: Consumer>(&mut self, consumer: &mut C) -> Result<Outcome> {
        let (len, src) = self
            .socket
            .recv_from(&mut self.buf)
            .await
            .context("Failed to receive UDP packet")?;

        let datagram = Datagram {
            payload: &self.buf[..len],
            src,
        };
        let outcome = consumer.consume(&datagram)?;

        if let Outcome::Updated(pause) = &outcome {
            if !pause.is_zero() {
                sleep(*pause).await;
            }
        }
        Ok(outcome)
    }

    /// Receive forever. Only returns on a fatal error.
    pub async fn run<C: Consumer>(&mut self, consumer: &mut C) -> Result<()> {
        loop {
            self.receive_one(consumer).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{DumpConsumer, PlotConsumer};
    use crate::frame::{Frame, FrameError};
    use crate::sink::FrameSink;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
    }

    impl FrameSink for Recorder {
        fn update(&mut self, frame: &Frame) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    fn loopback_config() -> Config {
        let mut config = Config::default();
        config.set_listen_addr("127.0.0.1:0".parse().unwrap());
        config
    }

    async fn sender_to(receiver: &Receiver) -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (socket, receiver.local_addr().unwrap())
    }

    #[tokio::test]
    async fn plot_path_over_loopback() {
        let mut receiver = Receiver::bind(&loopback_config()).await.unwrap();
        let (client, target) = sender_to(&receiver).await;
        let mut consumer = PlotConsumer::new(Recorder::default());

        client.send_to(b"hello", target).await.unwrap();
        assert_eq!(receiver.receive_one(&mut consumer).await.unwrap(), Outcome::Ignored);

        client.send_to(b"DATA:1.0,x,3.2", target).await.unwrap();
        assert!(matches!(
            receiver.receive_one(&mut consumer).await.unwrap(),
            Outcome::Dropped(FrameError::InvalidSample { .. })
        ));

        client.send_to(b"DATA:1.0,2.5,3.2", target).await.unwrap();
        assert_eq!(
            receiver.receive_one(&mut consumer).await.unwrap(),
            Outcome::Updated(Duration::ZERO)
        );

        assert_eq!(consumer.sink().frames, vec![Frame::new(vec![1.0, 2.5, 3.2])]);
    }

    #[tokio::test]
    async fn dump_path_reports_sender() {
        let mut receiver = Receiver::bind(&loopback_config()).await.unwrap();
        let (client, target) = sender_to(&receiver).await;
        let mut consumer = DumpConsumer::new(Vec::new(), 20);

        client.send_to(b"hello", target).await.unwrap();
        receiver.receive_one(&mut consumer).await.unwrap();

        let text = String::from_utf8(consumer.get_ref().clone()).unwrap();
        let expected = format!("GOT DATA from {}: b'hello'...\n", client.local_addr().unwrap());
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn oversized_datagram_is_truncated() {
        let mut config = loopback_config();
        config.buffer_size = 8;
        let mut receiver = Receiver::bind(&config).await.unwrap();
        let (client, target) = sender_to(&receiver).await;
        let mut consumer = DumpConsumer::new(Vec::new(), 20);

        client.send_to(b"0123456789abcdef", target).await.unwrap();
        receiver.receive_one(&mut consumer).await.unwrap();

        let text = String::from_utf8(consumer.get_ref().clone()).unwrap();
        assert!(text.ends_with(": b'01234567'...\n"));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = Receiver::bind(&loopback_config()).await.unwrap();
        let mut config = Config::default();
        config.set_listen_addr(taken.local_addr().unwrap());
        let err = Receiver::bind(&config).await.err().unwrap();
        assert!(err.to_string().contains("Failed to bind UDP socket"));
    }
}
