/// Stats from a harvest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    pub targets_ok: u32,
    pub targets_failed: u32,
    pub records_fetched: u32,
    pub records_unique: u32,
    pub already_stored: u32,
    pub blank: u32,
    pub collided: u32,
    pub stored: u64,
}

impl std::fmt::Display for HarvestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Complete ===")?;
        writeln!(f, "Targets ok:       {}", self.targets_ok)?;
        writeln!(f, "Targets failed:   {}", self.targets_failed)?;
        writeln!(f, "Records fetched:  {}", self.records_fetched)?;
        writeln!(f, "Unique records:   {}", self.records_unique)?;
        writeln!(f, "Already stored:   {}", self.already_stored)?;
        writeln!(f, "Blank content:    {}", self.blank)?;
        writeln!(f, "Id collisions:    {}", self.collided)?;
        writeln!(f, "Stored:           {}", self.stored)?;
        Ok(())
    }
}
