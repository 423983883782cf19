//! Thin wrapper over shakmaty for move legality and FEN bookkeeping.

use shakmaty::{
    fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Move, Position,
    Role, Square,
};

use crate::error::{CmfError, Result};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A position plus the number of half-moves applied since it was loaded.
#[derive(Debug, Clone)]
pub struct Board {
    pos: Chess,
    plies: u32,
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self> {
        let parsed: Fen = fen.trim().parse().map_err(|e| CmfError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let pos = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| CmfError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("{e}"),
            })?;
        Ok(Self { pos, plies: 0 })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    /// `"w"` or `"b"`.
    pub fn side_to_move(&self) -> &'static str {
        match self.pos.turn() {
            Color::White => "w",
            Color::Black => "b",
        }
    }

    /// Half-moves applied since the last load.
    pub fn plies(&self) -> u32 {
        self.plies
    }

    /// Full move number as counted from the last load: `floor(plies / 2) + 1`.
    pub fn move_number(&self) -> u32 {
        self.plies / 2 + 1
    }

    /// Resolve a SAN string (check suffixes allowed) against the current position.
    pub fn resolve_san(&self, san: &str) -> std::result::Result<Move, String> {
        let parsed: San = san
            .trim()
            .parse()
            .map_err(|e| format!("invalid SAN '{san}': {e}"))?;
        parsed
            .to_move(&self.pos)
            .map_err(|e| format!("illegal move '{san}': {e}"))
    }

    /// Resolve a from/to/promotion triple against the current position.
    pub fn resolve_coords(
        &self,
        from: &str,
        to: &str,
        promo: Option<&str>,
    ) -> std::result::Result<Move, String> {
        let from_sq: Square = from
            .trim()
            .parse()
            .map_err(|_| format!("invalid square '{from}'"))?;
        let to_sq: Square = to
            .trim()
            .parse()
            .map_err(|_| format!("invalid square '{to}'"))?;
        let promotion = match promo.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => {
                let c = p.chars().next().unwrap_or('q').to_ascii_lowercase();
                Some(Role::from_char(c).ok_or_else(|| format!("invalid promotion '{p}'"))?)
            }
            None => None,
        };

        let uci = UciMove::Normal {
            from: from_sq,
            to: to_sq,
            promotion,
        };
        uci.to_move(&self.pos)
            .map_err(|e| format!("illegal move {from}{to}: {e}"))
    }

    /// SAN for a legal move in the current position.
    pub fn san_of(&self, mv: &Move) -> String {
        San::from_move(&self.pos, mv.clone()).to_string()
    }

    /// Play a move previously resolved against this position.
    pub fn play(&mut self, mv: Move) {
        self.pos.play_unchecked(mv);
        self.plies += 1;
    }

    /// Apply a move given either as coordinates or SAN.
    ///
    /// Coordinates win when both are present; SAN is the legacy fallback.
    pub fn apply(
        &mut self,
        san: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        promo: Option<&str>,
    ) -> std::result::Result<(), String> {
        let mv = match (from, to, san) {
            (Some(f), Some(t), _) => self.resolve_coords(f, t, promo)?,
            (_, _, Some(s)) if !s.trim().is_empty() => self.resolve_san(s)?,
            _ => return Err("move has neither coordinates nor SAN".into()),
        };
        self.play(mv);
        Ok(())
    }
}

/// Strips move counters from a FEN, keeping placement, side, castling and ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Two FENs describe the same position, ignoring move counters.
pub fn same_position(a: &str, b: &str) -> bool {
    normalize_fen(a) == normalize_fen(b)
}
