use std::{
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, info};

use super::{
    codec::{encode_to_vec, read_message, write_message, Decode, Encode},
    schema::{
        Argument, ConnectionRequest, ConnectionResponse, ConnectionStatus, ConnectionType,
        ProcedureCall, Request, Response, Status,
    },
    Error,
};
use crate::config::ConnectionConfig;

/// Handle to an open RPC connection. Clones share the same socket, and each
/// call holds the socket for its whole request/response exchange.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    stream: Mutex<TcpStream>,
    client_name: String,
    client_identifier: Vec<u8>,
}

impl Connection {
    pub fn connect(config: &ConnectionConfig, client_name: &str) -> Result<Self, Error> {
        let addr = (config.address.as_str(), config.rpc_port);
        info!(
            "Connecting to kRPC server at {}:{} as '{client_name}'",
            config.address, config.rpc_port
        );

        let mut stream = connect_any(addr, config.timeout())?;
        stream.set_read_timeout(Some(config.timeout()))?;
        stream.set_write_timeout(Some(config.timeout()))?;
        stream.set_nodelay(true)?;

        write_message(
            &mut stream,
            &ConnectionRequest {
                kind: ConnectionType::Rpc as i32,
                client_name: client_name.to_string(),
                client_identifier: Vec::new(),
            },
        )?;

        let response: ConnectionResponse = read_message(&mut stream)?;
        let status = ConnectionStatus::try_from(response.status)
            .map_err(|_| Error::UnknownStatus(response.status))?;

        if status != ConnectionStatus::Ok {
            return Err(Error::ConnectionRefused {
                status,
                message: response.message,
            });
        }

        let conn = Self {
            inner: Arc::new(Inner {
                stream: Mutex::new(stream),
                client_name: client_name.to_string(),
                client_identifier: response.client_identifier,
            }),
        };

        let status = conn.status()?;
        info!("Connected! Server version {}", status.version);

        Ok(conn)
    }

    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    pub fn client_identifier(&self) -> &[u8] {
        &self.inner.client_identifier
    }

    /// Calls `service.procedure` with positional arguments and decodes the
    /// returned value.
    pub fn call<R: Decode>(
        &self,
        service: &str,
        procedure: &str,
        args: &[&dyn Encode],
    ) -> Result<R, Error> {
        let value = self.invoke(service, procedure, args)?;
        R::decode(&value)
    }

    pub fn status(&self) -> Result<Status, Error> {
        self.call("KRPC", "GetStatus", &[])
    }

    /// Shuts the socket down. Clones of this handle fail on their next call.
    pub fn close(&self) -> Result<(), Error> {
        let stream = self.inner.stream.lock().map_err(|_| Error::Poisoned)?;
        info!("Closing connection '{}'", self.inner.client_name);

        match stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn invoke(&self, service: &str, procedure: &str, args: &[&dyn Encode]) -> Result<Vec<u8>, Error> {
        let request = Request {
            calls: vec![ProcedureCall {
                service: service.to_string(),
                procedure: procedure.to_string(),
                arguments: args
                    .iter()
                    .enumerate()
                    .map(|(position, arg)| Argument {
                        position: position as u32,
                        value: encode_to_vec(*arg),
                    })
                    .collect(),
                ..Default::default()
            }],
        };

        debug!("-> {service}.{procedure} ({} args)", args.len());

        let response: Response = {
            let mut stream = self.inner.stream.lock().map_err(|_| Error::Poisoned)?;
            write_message(&mut *stream, &request)?;
            read_message(&mut *stream)?
        };

        if let Some(error) = response.error {
            return Err(error.into());
        }

        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingResult(format!("{service}.{procedure}")))?;

        if let Some(error) = result.error {
            return Err(error.into());
        }

        Ok(result.value)
    }
}

fn connect_any(addr: impl ToSocketAddrs, timeout: Duration) -> Result<TcpStream, Error> {
    let mut last_err = None;

    for sock_addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&sock_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))
        .into())
}
