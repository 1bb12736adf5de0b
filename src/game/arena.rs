//! Battlefield grid and nearest-enemy search

use std::collections::VecDeque;

use super::grid::Position;
use super::units::{Team, Unit, UnitId, UnitIndex};

/// Ordered occupants of one grid cell
///
/// Units stack freely; insertion order decides which occupant a search
/// sees first.
pub type Tile = Vec<UnitId>;

/// Neighbor expansion order for the breadth-first search: orthogonals
/// first, then diagonals. The order is fixed so path selection is
/// deterministic.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// The battlefield: a rectangular grid of tiles tracking unit placement
///
/// The arena stores occupancy only; unit state lives in the battle's
/// [`UnitIndex`].
#[derive(Debug, Clone)]
pub struct Arena {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Arena {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::new(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether a position rounds to a cell inside the grid
    pub fn in_bounds(&self, pos: Position) -> bool {
        let (x, y) = pos.rounded();
        self.cell_in_bounds(x, y)
    }

    pub fn cell_in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    fn tile_index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    /// Add a unit to a tile; out-of-bounds cells are ignored
    pub fn add_unit(&mut self, x: i32, y: i32, id: UnitId) {
        if !self.cell_in_bounds(x, y) {
            return;
        }
        let index = self.tile_index(x, y);
        self.tiles[index].push(id);
    }

    /// Remove a unit from a tile by id; absent ids are a no-op
    pub fn remove_unit(&mut self, x: i32, y: i32, id: UnitId) {
        if !self.cell_in_bounds(x, y) {
            return;
        }
        let index = self.tile_index(x, y);
        self.tiles[index].retain(|occupant| *occupant != id);
    }

    /// Units standing on a cell, in insertion order
    pub fn occupants(&self, x: i32, y: i32) -> &[UnitId] {
        if !self.cell_in_bounds(x, y) {
            return &[];
        }
        &self.tiles[self.tile_index(x, y)]
    }

    /// Breadth-first search for the closest enemy of `unit`
    ///
    /// Expands outward from the unit's cell one ring at a time and stops
    /// at the first tile holding any opposing unit. Returns that enemy
    /// together with the tile path from the searcher's cell to the
    /// enemy's cell, both endpoints included; a path of length one means
    /// the enemy shares the searcher's tile. Returns `None` when no
    /// enemy exists anywhere on the grid.
    pub fn find_nearest_enemy<'a>(
        &self,
        unit: &Unit,
        units: &'a UnitIndex,
    ) -> Option<(&'a Unit, Vec<Position>)> {
        let (start_x, start_y) = unit.position.rounded();
        if !self.cell_in_bounds(start_x, start_y) {
            return None;
        }

        let mut visited = vec![false; self.tiles.len()];
        let mut parents: Vec<Option<(i32, i32)>> = vec![None; self.tiles.len()];
        let mut queue = VecDeque::new();

        visited[self.tile_index(start_x, start_y)] = true;
        queue.push_back((start_x, start_y));

        while let Some((x, y)) = queue.pop_front() {
            if let Some(enemy) = self.enemy_on_tile(x, y, unit.team, units) {
                return Some((enemy, self.reconstruct_path(&parents, x, y)));
            }

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let (nx, ny) = (x + dx, y + dy);
                if !self.cell_in_bounds(nx, ny) {
                    continue;
                }
                let index = self.tile_index(nx, ny);
                if visited[index] {
                    continue;
                }
                visited[index] = true;
                parents[index] = Some((x, y));
                queue.push_back((nx, ny));
            }
        }

        None
    }

    /// First opposing unit standing on the given cell
    fn enemy_on_tile<'a>(
        &self,
        x: i32,
        y: i32,
        team: Team,
        units: &'a UnitIndex,
    ) -> Option<&'a Unit> {
        self.tiles[self.tile_index(x, y)]
            .iter()
            .find_map(|id| units.get(id).filter(|other| other.team != team))
    }

    /// Walk parent links back to the search origin and return the path
    /// in source-to-target order
    fn reconstruct_path(&self, parents: &[Option<(i32, i32)>], x: i32, y: i32) -> Vec<Position> {
        let mut cells = vec![(x, y)];
        let mut cursor = (x, y);
        while let Some(prev) = parents[self.tile_index(cursor.0, cursor.1)] {
            cells.push(prev);
            cursor = prev;
        }
        cells.reverse();
        cells
            .into_iter()
            .map(|(cx, cy)| Position::cell(cx, cy))
            .collect()
    }

    /// ASCII occupancy dump, one `[n]` per tile
    pub fn render(&self) -> String {
        let mut out = format!("Map ({}x{}):\n", self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push_str(&format!("[{}]", self.occupants(x, y).len()));
            }
            out.push('\n');
        }
        out
    }

    /// Occupancy dump with the given cells shown as `[*]`
    ///
    /// Handy for eyeballing a search path; markers win over counts.
    pub fn render_with_markers(&self, markers: &[Position]) -> String {
        let marked: Vec<(i32, i32)> = markers.iter().map(|p| p.rounded()).collect();
        let mut out = format!("Map ({}x{}):\n", self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if marked.contains(&(x, y)) {
                    out.push_str("[*]");
                } else {
                    out.push_str(&format!("[{}]", self.occupants(x, y).len()));
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::units::{UnitRole, UnitStats};

    fn test_unit(id: UnitId, team: Team, x: i32, y: i32) -> Unit {
        Unit::new(
            id,
            "SwordsmanOne",
            team,
            Position::cell(x, y),
            UnitStats::new(10, 1, 1.0, 1),
            UnitRole::Troop,
        )
    }

    fn place(arena: &mut Arena, units: &mut UnitIndex, unit: Unit) {
        let (x, y) = unit.position.rounded();
        arena.add_unit(x, y, unit.id);
        units.insert(unit.id, unit);
    }

    #[test]
    fn bounds_checks() {
        let arena = Arena::new(32, 32);
        assert!(arena.in_bounds(Position::cell(0, 0)));
        assert!(arena.in_bounds(Position::cell(31, 31)));
        assert!(!arena.in_bounds(Position::cell(-1, 0)));
        assert!(!arena.in_bounds(Position::cell(0, 32)));
        assert!(!arena.in_bounds(Position::new(31.6, 0.0)));
    }

    #[test]
    fn add_and_remove_preserve_order() {
        let mut arena = Arena::new(4, 4);
        arena.add_unit(2, 1, 7);
        arena.add_unit(2, 1, 9);
        arena.add_unit(2, 1, 11);
        assert_eq!(arena.occupants(2, 1), &[7, 9, 11]);

        arena.remove_unit(2, 1, 9);
        assert_eq!(arena.occupants(2, 1), &[7, 11]);

        // Removing an id that is not there changes nothing
        arena.remove_unit(2, 1, 9);
        assert_eq!(arena.occupants(2, 1), &[7, 11]);
    }

    #[test]
    fn out_of_bounds_add_is_dropped() {
        let mut arena = Arena::new(4, 4);
        arena.add_unit(-1, 2, 5);
        arena.add_unit(4, 0, 5);
        for y in 0..4 {
            for x in 0..4 {
                assert!(arena.occupants(x, y).is_empty());
            }
        }
    }

    #[test]
    fn bfs_finds_diagonal_path() {
        let mut arena = Arena::new(8, 8);
        let mut units = UnitIndex::new();
        let searcher = test_unit(1, Team::Red, 0, 0);
        place(&mut arena, &mut units, searcher.clone());
        place(&mut arena, &mut units, test_unit(2, Team::Blue, 3, 3));

        let (enemy, path) = arena.find_nearest_enemy(&searcher, &units).unwrap();
        assert_eq!(enemy.id, 2);
        // Diagonal steps make the path as long as the Chebyshev distance
        assert_eq!(path.len(), 4);
        assert_eq!(path[0], Position::cell(0, 0));
        assert_eq!(path[3], Position::cell(3, 3));
    }

    #[test]
    fn bfs_same_tile_enemy_yields_single_cell_path() {
        let mut arena = Arena::new(8, 8);
        let mut units = UnitIndex::new();
        let searcher = test_unit(1, Team::Red, 5, 5);
        place(&mut arena, &mut units, searcher.clone());
        place(&mut arena, &mut units, test_unit(2, Team::Blue, 5, 5));

        let (enemy, path) = arena.find_nearest_enemy(&searcher, &units).unwrap();
        assert_eq!(enemy.id, 2);
        assert_eq!(path, vec![Position::cell(5, 5)]);
    }

    #[test]
    fn bfs_prefers_closer_enemy() {
        let mut arena = Arena::new(16, 16);
        let mut units = UnitIndex::new();
        let searcher = test_unit(1, Team::Red, 8, 8);
        place(&mut arena, &mut units, searcher.clone());
        place(&mut arena, &mut units, test_unit(2, Team::Blue, 8, 13));
        place(&mut arena, &mut units, test_unit(3, Team::Blue, 10, 8));

        let (enemy, path) = arena.find_nearest_enemy(&searcher, &units).unwrap();
        assert_eq!(enemy.id, 3);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn bfs_ignores_allies() {
        let mut arena = Arena::new(8, 8);
        let mut units = UnitIndex::new();
        let searcher = test_unit(1, Team::Red, 0, 0);
        place(&mut arena, &mut units, searcher.clone());
        place(&mut arena, &mut units, test_unit(2, Team::Red, 1, 0));

        assert!(arena.find_nearest_enemy(&searcher, &units).is_none());
    }

    #[test]
    fn bfs_is_pure_and_deterministic() {
        let mut arena = Arena::new(8, 8);
        let mut units = UnitIndex::new();
        let searcher = test_unit(1, Team::Red, 4, 4);
        place(&mut arena, &mut units, searcher.clone());
        // Two enemies in the same ring
        place(&mut arena, &mut units, test_unit(2, Team::Blue, 6, 4));
        place(&mut arena, &mut units, test_unit(3, Team::Blue, 4, 6));

        let before = arena.render();
        let (first_enemy, first_path) = arena.find_nearest_enemy(&searcher, &units).unwrap();
        let (second_enemy, second_path) = arena.find_nearest_enemy(&searcher, &units).unwrap();

        assert_eq!(first_enemy.id, second_enemy.id);
        assert_eq!(first_path, second_path);
        assert_eq!(arena.render(), before);
    }

    #[test]
    fn render_shows_occupancy_counts() {
        let mut arena = Arena::new(3, 2);
        arena.add_unit(1, 0, 4);
        arena.add_unit(1, 0, 5);
        assert_eq!(arena.render(), "Map (3x2):\n[0][2][0]\n[0][0][0]\n");
    }

    #[test]
    fn render_with_markers_overlays_a_path() {
        let mut arena = Arena::new(3, 2);
        arena.add_unit(0, 0, 1);
        arena.add_unit(2, 1, 2);
        let path = vec![
            Position::cell(0, 0),
            Position::cell(1, 1),
            Position::cell(2, 1),
        ];
        assert_eq!(
            arena.render_with_markers(&path),
            "Map (3x2):\n[*][0][0]\n[0][*][*]\n"
        );
    }
}
