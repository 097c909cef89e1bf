use loadavg_core::LoadAverage;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Cycles `| / - \`, one frame per redraw.
#[derive(Debug, Default)]
pub struct Spinner {
    pos: usize,
}

impl Spinner {
    /// Current frame; advances to the next one.
    pub fn advance(&mut self) -> char {
        let frame = FRAMES[self.pos];
        self.pos = (self.pos + 1) % FRAMES.len();
        frame
    }
}

/// One status line, without the trailing carriage return.
pub fn render_line(frame: char, averages: &LoadAverage) -> String {
    format!(
        "{frame}\t{:.2} {:.2} {:.2}",
        averages.short, averages.medium, averages.long
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_wraps_around() {
        let mut spinner = Spinner::default();
        let frames: String = (0..9).map(|_| spinner.advance()).collect();
        assert_eq!(frames, "|/-\\|/-\\|");
    }

    #[test]
    fn line_has_two_decimals() {
        let averages = LoadAverage { short: 0.32, medium: 0.066_114_18, long: 1.0 / 3.0 };
        assert_eq!(render_line('/', &averages), "/\t0.32 0.07 0.33");
    }

    #[test]
    fn idle_line() {
        assert_eq!(render_line('|', &LoadAverage::default()), "|\t0.00 0.00 0.00");
    }
}
