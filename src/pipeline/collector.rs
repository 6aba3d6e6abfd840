use tokio::sync::mpsc;

/// Create the channel probe workers publish into.
///
/// The buffer holds every expected item so producers never wait on the
/// consumer. The collector closes the channel itself once it has received
/// `expected` items; producers never close it.
pub fn result_channel<T>(expected: usize) -> (mpsc::Sender<T>, ResultCollector<T>) {
    let (sender, receiver) = mpsc::channel(expected.max(1));
    let mut collector = ResultCollector {
        receiver,
        expected,
        received: 0,
        closed: false,
        #[cfg(test)]
        closes: 0,
    };
    if expected == 0 {
        collector.close();
    }
    (sender, collector)
}

/// Single consumer end of the result channel.
#[derive(Debug)]
pub struct ResultCollector<T> {
    receiver: mpsc::Receiver<T>,
    expected: usize,
    received: usize,
    closed: bool,
    #[cfg(test)]
    closes: usize,
}

impl<T> ResultCollector<T> {
    /// Next published item, or `None` once `expected` items were received or
    /// every producer went away.
    pub async fn next(&mut self) -> Option<T> {
        if self.received >= self.expected {
            self.close();
            return None;
        }

        match self.receiver.recv().await {
            Some(item) => {
                self.received += 1;
                if self.received == self.expected {
                    self.close();
                }
                Some(item)
            }
            None => {
                self.close();
                None
            }
        }
    }

    /// Close the channel. Only the first call has any effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();
        #[cfg(test)]
        {
            self.closes += 1;
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// How many times the channel was actually closed: 0 before completion, 1 after.
    #[cfg(test)]
    pub fn close_count(&self) -> usize {
        self.closes
    }
}
