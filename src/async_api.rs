use crate::rendering::RenderedImage;
use crate::{Error, Result, ServerConfig, StampService, StyleOptions};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    CheckTemplate(oneshot::Sender<Result<bool>>),
    Generate(String, StyleOptions, oneshot::Sender<Result<RenderedImage>>),
    Close(oneshot::Sender<()>),
}

/// An async-friendly stamping facade backed by a dedicated worker thread.
///
/// The worker thread owns the `StampService` and runs the (blocking)
/// layout and rasterization work, so async callers never block their
/// executor. Requests are processed one at a time in arrival order; each
/// either completes with a full image or fails, there is no cancellation.
#[derive(Clone)]
pub struct Stamper {
    cmd_tx: Sender<Command>,
}

impl Stamper {
    /// Create a stamper (spawns a background thread that owns the service).
    pub async fn new(config: Option<ServerConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        Self::from_service(move || Ok(StampService::new(&config))).await
    }

    /// Create a stamper around a service built on the worker thread.
    pub async fn from_service<F>(build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<StampService> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::Builder::new()
            .name("textstamp-render".into())
            .spawn(move || {
                let service = match build() {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::CheckTemplate(resp) => {
                            let res = service.check_template().map(|status| status.created);
                            let _ = resp.send(res);
                        }
                        Command::Generate(text, style, resp) => {
                            let res = service.generate(&text, &style);
                            let _ = resp.send(res);
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
            })?;

        // Wait for the worker to report whether the service came up
        let init_res = init_rx
            .await
            .map_err(|e| Error::ServerError(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Initialize the template if needed; returns whether it was synthesized by this call.
    pub async fn check_template(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::CheckTemplate(tx))?;
        rx.await
            .map_err(|e| Error::ServerError(format!("CheckTemplate canceled: {}", e)))?
    }

    /// Stamp `text` onto the template.
    pub async fn generate(&self, text: &str, style: StyleOptions) -> Result<RenderedImage> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Generate(text.to_string(), style, tx))?;
        rx.await
            .map_err(|e| Error::ServerError(format!("Generate canceled: {}", e)))?
    }

    /// Stop the worker thread. Other clones fail with a server error afterwards.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::ServerError(format!("Close canceled: {}", e)))
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::ServerError("render worker has stopped".into()))
    }
}
