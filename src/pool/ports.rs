use crate::error::{HarnessError, HarnessResult};

/// Hands out strictly increasing ports from a base.
///
/// Owned by the dispatching task only; workers never allocate.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    next: Option<u16>,
    last: u16,
}

impl PortAllocator {
    /// Allocator whose first port is `base`.
    pub fn new(base: u16) -> Self {
        Self {
            next: Some(base),
            last: base,
        }
    }

    /// Next unused port, or `PortsExhausted` past `u16::MAX`.
    pub fn next_port(&mut self) -> HarnessResult<u16> {
        let port = self
            .next
            .ok_or(HarnessError::PortsExhausted { last: self.last })?;
        self.last = port;
        self.next = port.checked_add(1);
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_strictly_increase_from_base() {
        let mut ports = PortAllocator::new(9000);
        let allocated: Vec<u16> = (0..5).map(|_| ports.next_port().expect("port")).collect();
        assert_eq!(allocated, vec![9000, 9001, 9002, 9003, 9004]);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut ports = PortAllocator::new(u16::MAX - 1);
        assert_eq!(ports.next_port().expect("port"), u16::MAX - 1);
        assert_eq!(ports.next_port().expect("port"), u16::MAX);
        assert!(matches!(
            ports.next_port(),
            Err(HarnessError::PortsExhausted { last: u16::MAX })
        ));
    }
}
