//=====================================================================================================================

Task generator:

The task generator (off-chain) calls 1 method on the CrowdFunding service manager

// Create task
- function createNewTask(string memory name, uint256 goalAmount, uint32 duration) external
    - emits NewTaskCreated(uint32 indexed taskIndex, Task task)


//=====================================================================================================================

Main thread:

Purpose: create a new task every 24 seconds.

    1> Load `.env`, parse options, read `hello-world/{chainId}.json` (helloWorldServiceManager).

    2> Verify chain ID thru Web3 API, same as the operator.

    3> Tick every 24s, first tick 24s after start.
        - name = {Adjective}{Noun}{0-999}
            Adjective: Quick, Lazy, Sleepy, Noisy, Hungry
            Noun:      Fox, Dog, Cat, Mouse, Bear
        - goalAmount = 1..=100 ETH (in wei)
        - duration = 1..=30 days (in seconds)
        - Start a submission task; the next tick never waits for it.


//=====================================================================================================================

Submission task:

    1> `createNewTask(name, goalAmount, duration)`, wait for the receipt.

    2> Look for `NewTaskCreated` among the receipt logs of the service manager.
        - found: log tx hash, then taskIndex, name, goal (ETH) and duration (days).
        Example: "Created task with index: 3, name: QuickFox12, goal amount: 42.0 ETH, duration: 7 days"
        - missing: log every event of the receipt.

    3> Failures are logged; the timer keeps firing.
