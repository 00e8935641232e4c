//! Ring cycle orchestration.
//!
//! One ring at a time: snapshot the speaker, interrupt it, play the
//! ringtone for its full length, then put the speaker back the way it was.

use std::sync::Arc;

use crate::catalog::AudioEntry;
use crate::context::UrlBuilder;
use crate::error::DoorbellError;
use crate::protocol_constants::{DOORBELL_TITLE, MAX_VOLUME};
use crate::services::device_resolver::SpeakerHandle;
use crate::services::ring_state::{RingGuard, RingState};
use crate::sonos::snapshot::Snapshot;
use crate::sonos::soap::SoapResult;
use crate::sonos::traits::SonosRemote;
use crate::sonos::types::TransportState;

/// Result of one [`DoorbellOrchestrator::ring`] call.
#[derive(Debug)]
pub enum RingOutcome {
    /// Another ring was in progress; nothing was sent to the speaker.
    Busy,
    /// The speaker is a group member or on TV input; left untouched.
    Skipped,
    /// The ringtone played and the previous state was restored.
    Completed,
    /// A remote-control command failed part-way through.
    Failed(DoorbellError),
}

/// Drives ring cycles against one speaker client.
pub struct DoorbellOrchestrator {
    remote: Arc<dyn SonosRemote>,
    state: RingState,
    urls: UrlBuilder,
}

impl DoorbellOrchestrator {
    /// Creates an orchestrator that serves ringtone URLs via `urls`.
    pub fn new(remote: Arc<dyn SonosRemote>, urls: UrlBuilder) -> Self {
        Self {
            remote,
            state: RingState::new(),
            urls,
        }
    }

    /// Whether a ring is in progress.
    #[must_use]
    pub fn is_ringing(&self) -> bool {
        self.state.is_ringing()
    }

    /// Enters the Ringing state, or returns None if a ring is in progress.
    ///
    /// The trigger handler takes the guard before acknowledging a press and
    /// hands it to [`ring_with_guard`](Self::ring_with_guard).
    #[must_use]
    pub fn try_begin(&self) -> Option<RingGuard> {
        self.state.try_enter()
    }

    /// Plays `entry` on `device` at `volume`, then restores the speaker.
    ///
    /// Returns [`RingOutcome::Busy`] without side effects while another ring
    /// runs. The Ringing state ends on every return path.
    pub async fn ring(&self, entry: &AudioEntry, volume: u8, device: &SpeakerHandle) -> RingOutcome {
        let Some(guard) = self.try_begin() else {
            log::info!("[Doorbell] Ring for '{}' ignored, already ringing", entry.display_name);
            return RingOutcome::Busy;
        };
        self.ring_with_guard(guard, entry, volume, device).await
    }

    /// Runs a ring cycle under a guard obtained from [`try_begin`](Self::try_begin).
    ///
    /// The guard is released when the cycle ends.
    pub async fn ring_with_guard(
        &self,
        guard: RingGuard,
        entry: &AudioEntry,
        volume: u8,
        device: &SpeakerHandle,
    ) -> RingOutcome {
        let outcome = match self.ring_cycle(entry, volume.min(MAX_VOLUME), device).await {
            Ok(true) => {
                log::info!("[Doorbell] Ring of '{}' on {} complete", entry.display_name, device);
                RingOutcome::Completed
            }
            Ok(false) => RingOutcome::Skipped,
            Err(e) => {
                log::error!("[Doorbell] Ring on {} failed: {}", device, e);
                RingOutcome::Failed(e.into())
            }
        };
        drop(guard);
        outcome
    }

    /// Runs one cycle; `Ok(false)` means the speaker was left alone.
    async fn ring_cycle(
        &self,
        entry: &AudioEntry,
        volume: u8,
        device: &SpeakerHandle,
    ) -> SoapResult<bool> {
        let ip = device.ip_string();
        let remote = self.remote.as_ref();

        let snapshot = Snapshot::capture(remote, &ip).await?;
        if !snapshot.is_coordinator() {
            log::warn!("[Doorbell] {} is not a group coordinator, skipping ring", device);
            return Ok(false);
        }
        if snapshot.is_tv_input() {
            log::warn!("[Doorbell] {} is playing TV input, skipping ring", device);
            return Ok(false);
        }

        if remote.get_transport_state(&ip).await? == TransportState::Playing {
            log::debug!("[Doorbell] Pausing {}", device);
            remote.pause(&ip).await?;
        }

        remote.set_speaker_volume(&ip, volume).await?;

        let url = self.urls.media_url(&entry.relative_path);
        log::info!(
            "[Doorbell] Playing '{}' on {} at volume {} ({:.1}s)",
            entry.display_name,
            device,
            volume,
            entry.duration_seconds
        );
        remote.play_uri(&ip, &url, DOORBELL_TITLE).await?;

        tokio::time::sleep(entry.duration()).await;

        if snapshot.is_cloud_queue() {
            log::warn!(
                "[Doorbell] {} was playing a cloud queue; resuming it will probably fail",
                device
            );
        }
        snapshot.restore(remote).await?;
        Ok(true)
    }
}
