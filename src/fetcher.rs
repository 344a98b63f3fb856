//! DNSSEC-aware record retrieval.
//!
//! A fetch is one exchange with one resolver. Retries, resolver rotation
//! and overall timeouts belong to the caller.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, trace};

use crate::config::ChainConfig;
use crate::dns::DNSPacket;
use crate::dns::enums::DNSResourceType;
use crate::dns::header::{RCODE_NOERROR, RCODE_NXDOMAIN};
use crate::dns::name::DomainName;
use crate::dns::resource::DNSResource;
use crate::dnssec::{DenialProof, RecordSet, Signature};
use crate::error::FetchError;

/// Largest response accepted over UDP
const MAX_UDP_RESPONSE: usize = 65_535;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub owner: DomainName,
    pub rtype: DNSResourceType,
    /// Zone expected to be authoritative, used for logging
    pub zone_hint: Option<DomainName>,
}

impl FetchRequest {
    pub fn new(owner: DomainName, rtype: DNSResourceType) -> Self {
        Self {
            owner,
            rtype,
            zone_hint: None,
        }
    }

    pub fn in_zone(mut self, zone: &DomainName) -> Self {
        self.zone_hint = Some(zone.clone());
        self
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.owner, self.rtype)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOutcome {
    Answered,
    NameError,
    NoData,
    ServerFailure,
    Timeout,
    NetworkError,
}

impl QueryOutcome {
    /// Failures worth another attempt against the next resolver
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueryOutcome::ServerFailure | QueryOutcome::Timeout | QueryOutcome::NetworkError
        )
    }

    pub fn is_failure(&self) -> bool {
        self.is_retryable()
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QueryOutcome::Answered => "answered",
            QueryOutcome::NameError => "NXDOMAIN",
            QueryOutcome::NoData => "no data",
            QueryOutcome::ServerFailure => "server failure",
            QueryOutcome::Timeout => "timeout",
            QueryOutcome::NetworkError => "network error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub outcome: QueryOutcome,
    pub answer: Option<RecordSet>,
    /// RRSIGs covering `answer`
    pub signatures: Vec<Signature>,
    pub denial: Option<DenialProof>,
    pub error: Option<FetchError>,
}

impl FetchResponse {
    pub fn answered(answer: RecordSet, signatures: Vec<Signature>) -> Self {
        Self {
            outcome: QueryOutcome::Answered,
            answer: Some(answer),
            signatures,
            denial: None,
            error: None,
        }
    }

    /// Negative answer (`NameError` or `NoData`) with an optional proof
    pub fn negative(outcome: QueryOutcome, denial: Option<DenialProof>) -> Self {
        Self {
            outcome,
            answer: None,
            signatures: Vec::new(),
            denial,
            error: None,
        }
    }

    pub fn failure(outcome: QueryOutcome, error: FetchError) -> Self {
        Self {
            outcome,
            answer: None,
            signatures: Vec::new(),
            denial: None,
            error: Some(error),
        }
    }

    /// Interpret a response packet for `request`, rejecting responses that
    /// do not belong to the query
    pub fn from_packet(request: &FetchRequest, query_id: u16, packet: &DNSPacket) -> Self {
        if let Err(e) = check_response(request, query_id, packet) {
            debug!("Rejecting response for {}: {}", request, e);
            return Self::failure(QueryOutcome::NetworkError, e);
        }

        let records: Vec<&DNSResource> = packet.records().collect();
        let denial = DenialProof::collect(&records);

        match packet.rcode() {
            rcode if rcode == RCODE_NXDOMAIN as u16 => {
                Self::negative(QueryOutcome::NameError, denial)
            }
            rcode if rcode == RCODE_NOERROR as u16 => {
                let answer = RecordSet::collect(packet.answers.iter(), &request.owner, request.rtype)
                    .or_else(|| {
                        // an alias at the owner answers any other type
                        (request.rtype != DNSResourceType::CNAME)
                            .then(|| {
                                RecordSet::collect(
                                    packet.answers.iter(),
                                    &request.owner,
                                    DNSResourceType::CNAME,
                                )
                            })
                            .flatten()
                    });
                match answer {
                    Some(answer) => {
                        let signatures =
                            Signature::collect(packet.answers.iter(), &answer.owner, answer.rtype);
                        Self::answered(answer, signatures)
                    }
                    None => Self::negative(QueryOutcome::NoData, denial),
                }
            }
            rcode => Self::failure(QueryOutcome::ServerFailure, FetchError::ServerFailure(rcode)),
        }
    }
}

fn check_response(request: &FetchRequest, query_id: u16, packet: &DNSPacket) -> Result<(), FetchError> {
    if packet.header.id != query_id {
        return Err(FetchError::Malformed(format!(
            "response ID {} does not match query ID {}",
            packet.header.id, query_id
        )));
    }
    if !packet.header.qr {
        return Err(FetchError::Malformed("QR bit clear in response".to_string()));
    }
    match packet.questions.as_slice() {
        [q] if q.name == request.owner && q.qtype == request.rtype => Ok(()),
        _ => Err(FetchError::Malformed(
            "question section does not echo the query".to_string(),
        )),
    }
}

/// Source of DNSSEC records. The network implementation is [`UdpFetcher`];
/// tests substitute in-memory sources.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest, resolver: SocketAddr) -> FetchResponse;
}

/// Queries a recursive resolver over UDP, retrying over TCP on truncation
#[derive(Debug, Clone)]
pub struct UdpFetcher {
    timeout: Duration,
    udp_payload_size: u16,
    tcp_fallback: bool,
}

impl UdpFetcher {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            timeout: config.timeout(),
            udp_payload_size: config.udp_payload_size,
            tcp_fallback: config.tcp_fallback,
        }
    }

    async fn exchange(
        &self,
        request: &FetchRequest,
        resolver: SocketAddr,
    ) -> Result<(u16, DNSPacket), FetchError> {
        let id = rand::random::<u16>();
        let query = DNSPacket::query(id, &request.owner, request.rtype, self.udp_payload_size);
        let query_bytes = query.serialize()?;

        trace!(
            "Sending {} bytes to {} for {} (zone {})",
            query_bytes.len(),
            resolver,
            request,
            request
                .zone_hint
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "?".to_string())
        );

        let response = self.send_udp_query(&query_bytes, resolver).await?;
        if response.header.tc && self.tcp_fallback {
            debug!("UDP response for {} truncated, retrying with TCP", request);
            let response = self.send_tcp_query(&query_bytes, resolver).await?;
            return Ok((id, response));
        }
        Ok((id, response))
    }

    async fn send_udp_query(
        &self,
        query_bytes: &[u8],
        resolver: SocketAddr,
    ) -> Result<DNSPacket, FetchError> {
        let bind_addr: SocketAddr = if resolver.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(resolver).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; MAX_UDP_RESPONSE];
        let response_len = socket.recv(&mut response_buf).await?;
        trace!(
            "Raw UDP response data ({} bytes): {:02x?}",
            response_len,
            &response_buf[..response_len.min(64)]
        );

        let response = DNSPacket::parse(&response_buf[..response_len])?;
        log_response_details(&response, response_len, "UDP");
        Ok(response)
    }

    async fn send_tcp_query(
        &self,
        query_bytes: &[u8],
        resolver: SocketAddr,
    ) -> Result<DNSPacket, FetchError> {
        let mut stream = TcpStream::connect(resolver).await?;

        stream
            .write_all(&(query_bytes.len() as u16).to_be_bytes())
            .await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0; response_length];
        stream.read_exact(&mut response_buf).await?;

        let response = DNSPacket::parse(&response_buf)?;
        log_response_details(&response, response_length, "TCP");
        Ok(response)
    }
}

fn log_response_details(response: &DNSPacket, response_len: usize, protocol: &str) {
    debug!(
        "Parsed {} response ({} bytes): rcode={}, answers={}, authorities={}, additional={}",
        protocol,
        response_len,
        response.rcode(),
        response.answers.len(),
        response.authorities.len(),
        response.resources.len()
    );
}

#[async_trait]
impl RecordSource for UdpFetcher {
    async fn fetch(&self, request: &FetchRequest, resolver: SocketAddr) -> FetchResponse {
        match tokio::time::timeout(self.timeout, self.exchange(request, resolver)).await {
            Err(_) => FetchResponse::failure(
                QueryOutcome::Timeout,
                FetchError::Timeout(self.timeout.as_millis() as u64),
            ),
            Ok(Err(e)) => {
                debug!("Query {} to {} failed: {}", request, resolver, e);
                FetchResponse::failure(QueryOutcome::NetworkError, e)
            }
            Ok(Ok((id, packet))) => FetchResponse::from_packet(request, id, &packet),
        }
    }
}
