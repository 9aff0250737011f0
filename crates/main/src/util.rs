use rand::{distributions::Alphanumeric, Rng};

pub fn short_random(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod test_short_random {
    use crate::util::short_random;

    #[test]
    fn test_requested_length() {
        assert_eq!(short_random(12).chars().count(), 12)
    }
}
