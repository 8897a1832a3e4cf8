//! The tokio event loop feeding the notifier.
//!
//! [`NotifyRunner`] owns a [`Notifier`] over real UDP sockets and plays
//! the role of the reactor: it waits for whichever comes first – a
//! zone-changed command from the server, readability of any outstanding
//! notify socket, or the earliest armed deadline – and dispatches the
//! matching event into the notifier. All campaign work happens inside
//! those synchronous dispatch calls; one scratch [`PacketBuf`] is reused
//! for every send and receive.

#![cfg(feature = "net")]

use std::future::pending;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::debug;
use crate::base::name::ZoneName;
use crate::base::soa::Soa;
use crate::base::wire::PacketBuf;
use super::driver::{
    Notifier, NotifyEvent, NotifySocket, SocketProvider,
};

//------------ UdpProvider ---------------------------------------------------

/// Creates connected, non-blocking UDP sockets for notify exchanges.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpProvider;

impl SocketProvider for UdpProvider {
    type Socket = UdpHandle;

    fn send(
        &mut self,
        target: SocketAddr,
        msg: &[u8],
    ) -> io::Result<UdpHandle> {
        let local = match target {
            SocketAddr::V4(_) => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
            }
            SocketAddr::V6(_) => {
                SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
            }
        };
        let socket = std::net::UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        socket.connect(target)?;
        let socket = UdpSocket::from_std(socket)?;
        socket.try_send(msg)?;
        Ok(UdpHandle(Arc::new(socket)))
    }
}

//------------ UdpHandle -----------------------------------------------------

/// The socket of one outstanding notify exchange.
#[derive(Clone, Debug)]
pub struct UdpHandle(Arc<UdpSocket>);

impl NotifySocket for UdpHandle {
    fn recv(&mut self, buf: &mut PacketBuf) -> io::Result<usize> {
        buf.fill(|space| self.0.try_recv(space))
    }
}

//------------ NotifyCommand -------------------------------------------------

/// A command for the notify runner.
#[derive(Clone, Debug)]
pub enum NotifyCommand {
    /// A zone's SOA changed; start (or restart) its notify campaign.
    ZoneChanged {
        /// The apex of the changed zone.
        apex: ZoneName,

        /// The zone's new SOA.
        soa: Soa,
    },
}

//------------ NotifyRunner --------------------------------------------------

/// The event loop around a [`Notifier`] on real UDP sockets.
pub struct NotifyRunner {
    /// The notifier being driven.
    notifier: Notifier<UdpProvider>,

    /// Zone-changed commands from the rest of the server.
    commands: mpsc::Receiver<NotifyCommand>,

    /// The scratch buffer shared by all zones' sends and receives.
    packet: PacketBuf,
}

impl NotifyRunner {
    /// Creates a runner around a notifier with all zones registered.
    pub fn new(
        notifier: Notifier<UdpProvider>,
        commands: mpsc::Receiver<NotifyCommand>,
    ) -> Self {
        NotifyRunner {
            notifier,
            commands,
            packet: PacketBuf::new(),
        }
    }

    /// Runs until the command channel closes, then closes all sockets.
    pub async fn run(mut self) {
        loop {
            // Deliver overdue timeouts before going back to sleep. This
            // also performs the immediate first send of a freshly started
            // campaign.
            let now = Instant::now();
            for apex in self.notifier.due_zones(now) {
                self.notifier.on_event(
                    &apex,
                    NotifyEvent::Timeout,
                    &mut self.packet,
                );
            }

            let next_deadline = self.notifier.next_deadline();
            let mut readable: FuturesUnordered<_> = self
                .notifier
                .armed_sockets()
                .into_iter()
                .map(|(apex, handle)| async move {
                    // Errors surface through try_recv on dispatch.
                    let _ = handle.0.readable().await;
                    apex
                })
                .collect();
            let timer = async {
                match next_deadline {
                    Some(at) => {
                        sleep_until(tokio::time::Instant::from_std(at))
                            .await
                    }
                    None => pending().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(NotifyCommand::ZoneChanged { apex, soa }) => {
                        debug!("zone {}: soa changed, starting notify", apex);
                        self.notifier.start_campaign(&apex, soa);
                    }
                    None => break,
                },
                Some(apex) = readable.next() => {
                    self.notifier.on_event(
                        &apex,
                        NotifyEvent::Readable,
                        &mut self.packet,
                    );
                }
                () = timer => {}
            }
        }
        self.notifier.shutdown();
    }
}
