//! Page source: the ordered page numbers fed to the page stage

use crate::config::PageRange;
use crate::state::PageTask;
use kanal::AsyncSender;
use tokio_util::sync::CancellationToken;

/// Produces page numbers for one run
#[derive(Debug, Clone, Copy)]
pub struct PageSource {
    range: PageRange,
}

impl PageSource {
    pub fn new(range: PageRange) -> Self {
        Self { range }
    }

    /// Page numbers in increasing order
    ///
    /// A bounded range `[first, last)` yields `last - first` pages, or none
    /// when `last <= first`. An unbounded range counts up to `u32::MAX`.
    pub fn pages(&self) -> impl Iterator<Item = PageTask> {
        let (start, end) = match self.range {
            PageRange::Bounded { first, last } => (u64::from(first), u64::from(last)),
            PageRange::Unbounded { first } => (u64::from(first), u64::from(u32::MAX) + 1),
        };

        // start and end both fit in u32 once start < end
        (start..end).map(|n| PageTask(n as u32))
    }

    /// Sends pages into `tx` until the range ends or the pipeline stops
    ///
    /// # Arguments
    ///
    /// * `tx` - Page queue of the page stage; dropped on return, which closes it
    /// * `stop` - The page stage's cancellation token
    /// * `exhausted` - Cancelled by a page worker that saw "not found"
    ///
    /// # Returns
    ///
    /// Number of pages handed to the queue
    pub async fn run(
        self,
        tx: AsyncSender<PageTask>,
        stop: CancellationToken,
        exhausted: CancellationToken,
    ) -> u64 {
        let mut emitted = 0;

        for page in self.pages() {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    tracing::debug!("Page source stopped before page {}", page);
                    break;
                }
                _ = exhausted.cancelled() => {
                    tracing::info!("Catalog exhausted, no pages after {}", page.number().saturating_sub(1));
                    break;
                }
                sent = tx.send(page) => {
                    if sent.is_err() {
                        tracing::debug!("Page queue closed before page {}", page);
                        break;
                    }
                    emitted += 1;
                }
            }
        }

        tracing::debug!("Page source finished after {} pages", emitted);
        emitted
    }
}
