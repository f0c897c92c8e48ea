//! gRPC Service Implementation
//!
//! This module implements `jotter.v1.NoteService` from
//! proto/jotter/v1/notes.proto. Each handler validates the request shape,
//! hands off to the service layer and maps the result onto the wire types.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};

use jotter_core::{LivenessProbe, Note, NoteCache, NoteDraft, NoteId, NoteStore, Timestamp};

use crate::error::{ApiError, ApiResult};
use crate::services::{LivenessInteractor, NoteInteractor};

// Include the generated protobuf code
pub mod proto {
    tonic::include_proto!("jotter.v1");

    /// Encoded descriptor set for the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("jotter_descriptor");
}

use proto::*;

// ============================================================================
// CONVERSION HELPERS
// ============================================================================

fn timestamp_to_proto(ts: &Timestamp) -> prost_types::Timestamp {
    // chrono reports leap seconds as nanos >= 1e9; protobuf forbids that.
    let nanos = ts.timestamp_subsec_nanos().min(999_999_999);
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: nanos as i32,
    }
}

fn note_to_proto(note: &Note) -> NoteResponse {
    NoteResponse {
        id: note.id.get(),
        title: note.title.clone(),
        content: note.content.clone(),
        created_at: Some(timestamp_to_proto(&note.created_at)),
    }
}

fn parse_create_request(req: CreateNoteRequest) -> ApiResult<NoteDraft> {
    Ok(NoteDraft::new(req.title, req.content)?)
}

fn parse_note_id(raw: i64) -> ApiResult<NoteId> {
    NoteId::new(raw).ok_or_else(|| ApiError::invalid_input("id must be positive"))
}

// ============================================================================
// NOTE SERVICE IMPLEMENTATION
// ============================================================================

#[derive(Clone)]
pub struct NoteServiceImpl {
    notes: Arc<NoteInteractor>,
    liveness: Arc<LivenessInteractor>,
}

impl NoteServiceImpl {
    pub fn new(notes: Arc<NoteInteractor>, liveness: Arc<LivenessInteractor>) -> Self {
        Self { notes, liveness }
    }

    /// Wire both orchestrators from adapters that double as their own
    /// liveness probes. `cache_timeout` bounds each cache call made on a
    /// note request, `ping_timeout` bounds each backend inside Ping.
    pub fn from_ports<S, C>(
        store: Arc<S>,
        cache: Arc<C>,
        cache_timeout: Duration,
        ping_timeout: Duration,
    ) -> Self
    where
        S: NoteStore + LivenessProbe + 'static,
        C: NoteCache + LivenessProbe + 'static,
    {
        let notes =
            NoteInteractor::new(store.clone(), cache.clone()).with_cache_timeout(cache_timeout);
        let liveness = LivenessInteractor::new(store, cache).with_check_timeout(ping_timeout);
        Self::new(Arc::new(notes), Arc::new(liveness))
    }
}

#[tonic::async_trait]
impl note_service_server::NoteService for NoteServiceImpl {
    #[tracing::instrument(skip_all, fields(rpc = "Ping"))]
    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        let report = self.liveness.check().await;
        tracing::debug!(status = ?report.status(), "ping answered");

        Ok(Response::new(PingResponse {
            store_available: report.store_available,
            cache_available: report.cache_available,
            message: report.message,
        }))
    }

    #[tracing::instrument(skip_all, fields(rpc = "CreateNote"))]
    async fn create_note(
        &self,
        request: Request<CreateNoteRequest>,
    ) -> Result<Response<NoteResponse>, Status> {
        let draft = parse_create_request(request.into_inner())?;

        let note = self
            .notes
            .create_note(draft)
            .await
            .map_err(|e| ApiError::operation_failed("create note", &e))?;

        Ok(Response::new(note_to_proto(&note)))
    }

    #[tracing::instrument(skip_all, fields(rpc = "GetNote"))]
    async fn get_note(
        &self,
        request: Request<GetNoteRequest>,
    ) -> Result<Response<NoteResponse>, Status> {
        let id = parse_note_id(request.into_inner().id)?;

        let note = self
            .notes
            .get_note(id)
            .await
            .map_err(|e| ApiError::operation_failed("get note", &e))?;

        Ok(Response::new(note_to_proto(&note)))
    }
}

#[cfg(test)]
mod tests {
    use super::note_service_server::NoteService;
    use super::*;
    use chrono::{TimeZone, Utc};
    use jotter_test_utils::{MockNoteCache, MockNoteStore, StaticProbe};
    use tonic::Code;

    struct Harness {
        store: Arc<MockNoteStore>,
        cache: Arc<MockNoteCache>,
        service: NoteServiceImpl,
    }

    fn harness() -> Harness {
        let store = Arc::new(MockNoteStore::new());
        let cache = Arc::new(MockNoteCache::new());
        let notes = NoteInteractor::new(store.clone(), cache.clone());
        let liveness = LivenessInteractor::new(
            Arc::new(StaticProbe::up("PostgreSQL")),
            Arc::new(StaticProbe::down("Redis", "connection refused")),
        );
        Harness {
            store,
            cache,
            service: NoteServiceImpl::new(Arc::new(notes), Arc::new(liveness)),
        }
    }

    fn create_request(title: &str, content: &str) -> Request<CreateNoteRequest> {
        Request::new(CreateNoteRequest {
            title: title.to_string(),
            content: content.to_string(),
        })
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let proto = timestamp_to_proto(&ts);
        assert_eq!(proto.seconds, 1_700_000_000);
        assert_eq!(proto.nanos, 123_456_789);
    }

    #[tokio::test]
    async fn test_create_note_maps_response() {
        let h = harness();

        let response = h
            .service
            .create_note(create_request("title", "content"))
            .await
            .unwrap()
            .into_inner();

        assert!(response.id > 0);
        assert_eq!(response.title, "title");
        assert_eq!(response.content, "content");
        let created_at = response.created_at.expect("created_at is always set");
        assert!(created_at.seconds > 0);
    }

    #[tokio::test]
    async fn test_empty_title_rejected_before_store() {
        let h = harness();

        let status = h
            .service
            .create_note(create_request("", "x"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "title is required");
        assert_eq!(h.store.calls(), 0);
        assert_eq!(h.cache.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_content_rejected_before_store() {
        let h = harness();

        let status = h
            .service
            .create_note(create_request("x", ""))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "content is required");
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_ids_rejected() {
        let h = harness();

        for id in [0, -1, i64::MIN] {
            let status = h
                .service
                .get_note(Request::new(GetNoteRequest { id }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), Code::InvalidArgument);
            assert_eq!(status.message(), "id must be positive");
        }
        assert_eq!(h.store.calls(), 0);
        assert_eq!(h.cache.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_note_is_internal_with_message() {
        let h = harness();

        let status = h
            .service
            .get_note(Request::new(GetNoteRequest { id: 404 }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "failed to get note: note with id 404 not found");
    }

    #[tokio::test]
    async fn test_store_outage_is_internal() {
        let h = harness();
        h.store.set_fail_writes(true);

        let status = h
            .service
            .create_note(create_request("title", "content"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().starts_with("failed to create note: "));
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let h = harness();

        let created = h
            .service
            .create_note(create_request("roundtrip", "body"))
            .await
            .unwrap()
            .into_inner();
        let fetched = h
            .service
            .get_note(Request::new(GetNoteRequest { id: created.id }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_ping_reports_outage_as_data() {
        let h = harness();

        let response = h
            .service
            .ping(Request::new(PingRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert!(response.store_available);
        assert!(!response.cache_available);
        assert_eq!(
            response.message,
            "PostgreSQL is available, Redis is not: connection refused"
        );
    }
}
