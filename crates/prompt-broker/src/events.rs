use protocol::control::HostEvent;
use tokio::sync::oneshot;
use uuid::Uuid;

pub(crate) enum ServiceCommand {
    Host { connection: Uuid, event: HostEvent },
    /// Drops every active sequence and stops the service loop; replies with the count.
    Shutdown(oneshot::Sender<usize>),
}
